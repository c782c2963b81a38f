use rstest::rstest;

use super::*;
use crate::data_structs::enums::Severity;
use crate::data_structs::Qualifier;
use crate::diagnostics::rejection;

fn gap(
    location: &str,
    length: &str,
) -> ParsedFeature {
    ParsedFeature::new(0, "gap", location, vec![Qualifier::bare("estimated_length", length)])
}

fn assembly_gap(
    location: &str,
    length: &str,
    gap_type: &str,
    evidence: &[&str],
) -> ParsedFeature {
    let mut qualifiers = vec![
        Qualifier::bare("estimated_length", length),
        Qualifier::quoted("gap_type", gap_type),
    ];
    qualifiers.extend(
        evidence
            .iter()
            .map(|e| Qualifier::bare("linkage_evidence", *e)),
    );
    ParsedFeature::new(0, "assembly_gap", location, qualifiers)
}

fn run(
    validator: GapFeatureValidator,
    features: &[ParsedFeature],
) -> (anyhow::Result<Vec<GapFeatureRecord>>, Diagnostics) {
    let mut diags = Diagnostics::new("GAP01");
    let res = validator.validate(features, &mut diags);
    (res, diags)
}

fn ncbi() -> GapFeatureValidator {
    GapFeatureValidator::new(SourceDb::Ncbi, HtgPhase::None, 10_000)
}

fn reject_code(res: anyhow::Result<Vec<GapFeatureRecord>>) -> ErrorCode {
    let err = res.expect_err("expected a reject");
    let diag = rejection(&err).unwrap();
    assert_eq!(diag.severity, Severity::Reject);
    diag.code
}

#[rstest]
fn test_valid_gaps_sorted() {
    let (res, diags) = run(ncbi(), &[
        assembly_gap("501..600", "100", "within scaffold", &["paired-ends", "map"]),
        assembly_gap("101..200", "unknown", "between scaffolds", &[]),
        ParsedFeature::new(1, "CDS", "1..99", vec![]),
    ]);
    let gaps = res.unwrap();
    assert!(diags.is_empty());
    assert_eq!(gaps.len(), 2);
    assert_eq!((gaps[0].from, gaps[0].to), (101, 200));
    assert_eq!(gaps[0].estimated_length, GapLength::Unknown);
    assert_eq!(gaps[1].gap_type, Some(GapType::WithinScaffold));
    assert_eq!(gaps[1].linkage_evidence, vec![
        LinkageEvidence::PairedEnds,
        LinkageEvidence::Map
    ]);
    assert!(gaps[1].is_assembly_gap);
}

#[rstest]
#[case::missing_linkage(
    vec![assembly_gap("101..200", "100", "within scaffold", &[])],
    ErrorCode::MissingLinkageEvidence
)]
#[case::length_mismatch(vec![gap("1..100", "50")], ErrorCode::GapLengthMismatch)]
#[case::illegal_linkage(
    vec![assembly_gap("101..200", "100", "telomere", &["map"])],
    ErrorCode::IllegalLinkageEvidence
)]
#[case::bad_linkage(
    vec![assembly_gap("101..200", "100", "within scaffold", &["guess"])],
    ErrorCode::InvalidLinkageEvidence
)]
#[case::bad_type(vec![assembly_gap("101..200", "100", "middle", &[])], ErrorCode::InvalidGapType)]
#[case::no_type(
    vec![ParsedFeature::new(0, "assembly_gap", "1..10", vec![Qualifier::bare("estimated_length", "10")])],
    ErrorCode::MissingGapType
)]
#[case::no_length(vec![ParsedFeature::new(0, "gap", "1..10", vec![])], ErrorCode::MissingEstimatedLength)]
#[case::zero_length(vec![gap("1..10", "0")], ErrorCode::InvalidEstimatedLength)]
#[case::text_length(vec![gap("1..10", "ten")], ErrorCode::InvalidEstimatedLength)]
#[case::join(vec![gap("join(1..10,20..30)", "21")], ErrorCode::GapLocation)]
#[case::reversed(vec![gap("10..1", "10")], ErrorCode::GapLocation)]
#[case::past_end(vec![gap("9991..10010", "20")], ErrorCode::GapOutOfRange)]
#[case::mixed(
    vec![gap("1..10", "10"), assembly_gap("101..200", "100", "telomere", &[])],
    ErrorCode::MixedGapFeatures
)]
#[case::overlap(vec![gap("1..100", "100"), gap("50..149", "100")], ErrorCode::OverlappingGaps)]
#[case::contained(
    vec![gap("1..100", "100"), gap("10..19", "10"), gap("50..59", "10")],
    ErrorCode::OverlappingGaps
)]
#[case::adjacent(vec![gap("1..100", "100"), gap("101..110", "10")], ErrorCode::ContiguousGaps)]
fn test_gap_rejects(
    #[case] features: Vec<ParsedFeature>,
    #[case] code: ErrorCode,
) {
    let (res, _) = run(ncbi(), &features);
    assert_eq!(reject_code(res), code);
}

#[rstest]
#[case(SourceDb::Embl)]
#[case(SourceDb::Ddbj)]
fn test_length_mismatch_tolerated(#[case] db: SourceDb) {
    let validator = GapFeatureValidator::new(db, HtgPhase::None, 10_000);
    let (res, diags) = run(validator, &[gap("1..100", "50")]);
    assert_eq!(res.unwrap()[0].estimated_length, GapLength::Known(50));
    assert!(diags.has_code(ErrorCode::GapLengthMismatch));
    assert_eq!(diags.highest(), Some(Severity::Warning));
}

#[rstest]
fn test_adjacency_tolerated_for_ddbj() {
    let validator = GapFeatureValidator::new(SourceDb::Ddbj, HtgPhase::None, 10_000);
    let (res, diags) = run(validator, &[gap("1..100", "100"), gap("101..110", "10")]);
    assert_eq!(res.unwrap().len(), 2);
    assert!(diags.has_code(ErrorCode::ContiguousGaps));

    let validator = GapFeatureValidator::new(SourceDb::Embl, HtgPhase::None, 10_000);
    let (res, _) = run(validator, &[gap("1..100", "100"), gap("101..110", "10")]);
    assert_eq!(reject_code(res), ErrorCode::ContiguousGaps);
}

#[rstest]
fn test_htg_expectations() {
    let draft = GapFeatureValidator::new(SourceDb::Ncbi, HtgPhase::Phase1, 10_000);
    let (res, diags) = run(draft, &[
        gap("1..50", "unknown"),
        assembly_gap("201..300", "100", "within scaffold", &["paired-ends"]),
    ]);
    assert!(res.is_err());
    assert!(diags.has_code(ErrorCode::MixedGapFeatures));

    let draft = GapFeatureValidator::new(SourceDb::Ncbi, HtgPhase::Phase1, 10_000);
    let (res, diags) = run(draft, &[
        assembly_gap("1..50", "unknown", "between scaffolds", &[]),
        assembly_gap("201..300", "100", "within scaffold", &["paired-ends"]),
    ]);
    assert!(res.is_ok());
    assert!(diags.has_code(ErrorCode::UnknownGapLength));
    assert!(diags.has_code(ErrorCode::HtgLinkageEvidence));

    let finished = GapFeatureValidator::new(SourceDb::Ncbi, HtgPhase::Phase3, 10_000);
    let (res, diags) = run(finished, &[assembly_gap(
        "201..300",
        "100",
        "within scaffold",
        &["unspecified"],
    )]);
    assert!(res.is_ok());
    assert!(diags.has_code(ErrorCode::HtgLinkageEvidence));
}

#[rstest]
fn test_accepted_gaps_never_overlap() {
    let features = (0..20)
        .map(|i| {
            let from = 1 + i * 300;
            gap(&format!("{}..{}", from, from + 99), "100")
        })
        .rev()
        .collect::<Vec<_>>();
    let (res, _) = run(ncbi(), &features);
    let gaps = res.unwrap();
    for pair in gaps.windows(2) {
        assert!(pair[0].to < pair[1].from);
        assert!(!pair[0].span().overlaps(&pair[1].span()));
    }
}
