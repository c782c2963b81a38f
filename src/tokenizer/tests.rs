use rstest::{
    fixture,
    rstest,
};

use super::*;
use crate::collaborators::DEFAULT_GRAMMAR;
use crate::data_structs::QualifierList;

#[fixture]
fn tokenizer() -> QualifierTokenizer<'static> {
    QualifierTokenizer::new(&*DEFAULT_GRAMMAR)
}

fn block(qualifiers: &str) -> RawFeatureBlock {
    RawFeatureBlock::new(0, "misc_feature", "1..100", qualifiers)
}

fn run(
    tokenizer: &QualifierTokenizer,
    qualifiers: &str,
) -> (ParsedFeature, Diagnostics) {
    let mut diags = Diagnostics::new("TEST01");
    let feature = tokenizer.tokenize(&block(qualifiers), &mut diags);
    (feature, diags)
}

#[rstest]
fn test_simple_qualifiers(tokenizer: QualifierTokenizer) {
    let (feature, diags) = run(&tokenizer, "/gene=\"abc\"\n/pseudo\n/number=3");
    assert!(diags.is_empty());
    assert_eq!(feature.qualifiers.len(), 3);
    assert_eq!(feature.value_of(QualifierKind::Gene), Some("abc"));
    assert!(feature.qualifiers[0].quoted);
    assert!(feature.has(QualifierKind::Pseudo));
    assert_eq!(feature.qualifiers[2].value.as_deref(), Some("3"));
    assert!(!feature.qualifiers[2].quoted);
}

#[rstest]
fn test_wrapped_quoted_value(tokenizer: QualifierTokenizer) {
    let (feature, diags) = run(
        &tokenizer,
        "/note=\"a note that\n   wraps over\nthree lines\"\n/gene=\"x\"",
    );
    assert!(diags.is_empty());
    assert_eq!(
        feature.value_of(QualifierKind::Note),
        Some("a note that wraps over three lines")
    );
}

#[rstest]
fn test_untrusted_closing_quote(tokenizer: QualifierTokenizer) {
    // The quote ending the first line is followed by text, not a qualifier,
    // so the value keeps going.
    let (feature, diags) = run(
        &tokenizer,
        "/product=\"protein \"alpha\"\nsubunit\"\n/gene=\"x\"",
    );
    assert!(diags.is_empty());
    assert_eq!(
        feature.value_of(QualifierKind::Product),
        Some("protein \"alpha\" subunit")
    );
}

#[rstest]
fn test_embedded_qualifier_terminates_open_quote(tokenizer: QualifierTokenizer) {
    let (feature, diags) = run(&tokenizer, "/product=\"never closed\n/gene=\"abc\"");
    assert!(diags.has_code(ErrorCode::UnbalancedQuotes));
    assert!(!feature.has(QualifierKind::Product));
    assert_eq!(feature.value_of(QualifierKind::Gene), Some("abc"));
}

#[rstest]
fn test_escaped_quotes(tokenizer: QualifierTokenizer) {
    let (feature, diags) = run(&tokenizer, "/note=\"called \"\"beta\"\" here\"");
    assert!(diags.is_empty());
    assert_eq!(feature.value_of(QualifierKind::Note), Some("called \"beta\" here"));
}

#[rstest]
fn test_translation_and_rpt_unit(tokenizer: QualifierTokenizer) {
    let (feature, _) = run(
        &tokenizer,
        "/translation=\"MKV LLA\nGHT\"\n/rpt_unit_seq=ACGT\n/replace=\"a c\"",
    );
    assert_eq!(feature.value_of(QualifierKind::Translation), Some("MKVLLAGHT"));
    assert_eq!(feature.value_of(QualifierKind::RptUnitSeq), Some("acgt"));
    assert_eq!(feature.value_of(QualifierKind::Replace), Some("ac"));
}

#[rstest]
fn test_unquoted_continuation_joins_without_blank(tokenizer: QualifierTokenizer) {
    let (feature, _) = run(&tokenizer, "/inference=similar to\nsequence:INSD:AB1");
    assert_eq!(
        feature.value_of(QualifierKind::Inference),
        Some("similar tosequence:INSD:AB1")
    );
}

#[rstest]
fn test_notes_merge(tokenizer: QualifierTokenizer) {
    let (feature, _) = run(
        &tokenizer,
        "/note=\"first\"\n/gene=\"g\"\n/note=\"second~line\"",
    );
    assert_eq!(feature.count_of(QualifierKind::Note), 1);
    assert_eq!(feature.qualifiers[0].kind, QualifierKind::Note);
    assert_eq!(
        feature.value_of(QualifierKind::Note),
        Some("first; ~second~line")
    );
}

#[rstest]
fn test_note_checks(tokenizer: QualifierTokenizer) {
    let (feature, diags) = run(&tokenizer, "/note=\"see /gene=abc for details\"");
    assert!(diags.has_code(ErrorCode::NoteEmbedsQualifier));
    assert!(feature.has(QualifierKind::Note));

    let (feature, diags) = run(&tokenizer, "/note=\"odd \"quote here\"\n/gene=\"g\"");
    assert!(diags.has_code(ErrorCode::NoteUnbalancedQuotes));
    assert!(!feature.has(QualifierKind::Note));
    assert!(feature.has(QualifierKind::Gene));
}

#[rstest]
#[case("/focus=\"yes\"", ErrorCode::UnexpectedQualifierValue, true)]
#[case("/gene", ErrorCode::MissingQualifierValue, false)]
#[case("/gene=\"\"", ErrorCode::MissingQualifierValue, false)]
#[case("stray words\n/gene=\"a\"", ErrorCode::StrayText, true)]
#[case("/bad name=\"a\"", ErrorCode::MalformedQualifier, false)]
fn test_legality_table(
    tokenizer: QualifierTokenizer,
    #[case] text: &str,
    #[case] code: ErrorCode,
    #[case] kept: bool,
) {
    let (feature, diags) = run(&tokenizer, text);
    assert!(diags.has_code(code), "{:?}", diags);
    assert_eq!(!feature.qualifiers.is_empty(), kept);
    for q in &feature.qualifiers {
        if q.kind == QualifierKind::Focus {
            assert!(q.value.is_none());
        }
    }
}

#[rstest]
fn test_tokenize_keeps_order_key_location(tokenizer: QualifierTokenizer) {
    let mut diags = Diagnostics::new("TEST01");
    let raw = RawFeatureBlock::new(7, "CDS", "join(1..5,8..10)", "/gene=\"a\"");
    let feature = tokenizer.tokenize(&raw, &mut diags);
    assert_eq!(feature.order, 7);
    assert_eq!(feature.key, "CDS");
    assert_eq!(feature.location, "join(1..5,8..10)");
}
