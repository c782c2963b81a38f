use std::sync::{
    Arc,
    Mutex,
};

use rstest::{
    fixture,
    rstest,
};

use super::rna::{
    normalize_rrna_product,
    normalize_trna_product,
};
use super::*;
use crate::collaborators::{
    StaticTaxonomy,
    TaxonLookup,
};
use crate::diagnostics::DiagnosticSink;

const LEN: u32 = 1000;

fn human_source() -> RawFeatureBlock {
    RawFeatureBlock::new(
        0,
        "source",
        "1..1000",
        "/organism=\"Homo sapiens\"\n/mol_type=\"genomic DNA\"",
    )
}

fn blocks(features: &[(&str, &str, &str)]) -> Vec<RawFeatureBlock> {
    let mut out = vec![human_source()];
    out.extend(
        features
            .iter()
            .enumerate()
            .map(|(i, (key, loc, quals))| RawFeatureBlock::new(i + 1, *key, *loc, *quals)),
    );
    out
}

fn meta() -> RecordMeta {
    RecordMeta::new("ASM01", LEN)
}

#[fixture]
fn assembler() -> FeatureAssembler {
    FeatureAssembler::default()
}

fn assembled(outcome: &RecordOutcome) -> &AssembledRecord {
    outcome
        .record
        .as_ref()
        .unwrap_or_else(|| panic!("record rejected: {:?}", outcome.rejection()))
}

fn feature<'a>(
    record: &'a AssembledRecord,
    key: &str,
) -> &'a ParsedFeature {
    record
        .features
        .iter()
        .find(|f| f.key == key)
        .unwrap_or_else(|| panic!("no {} feature", key))
}

fn rejected_with(
    outcome: &RecordOutcome,
    code: ErrorCode,
) {
    assert!(outcome.is_rejected(), "record was not rejected");
    let reject = outcome.rejection().unwrap();
    assert_eq!(reject.severity, Severity::Reject);
    assert_eq!(reject.code, code);
}

#[rstest]
fn test_plain_record(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("gene", "101..400", "/gene=\"abc\"\n/locus_tag=\"ABC_0001\""),
        ("CDS", "101..400", "/gene=\"abc\"\n/locus_tag=\"ABC_0001\"\n/product=\"thing\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let record = assembled(&outcome);
    assert_eq!(record.descriptor.taxname, "Homo sapiens");
    assert_eq!(record.features.len(), 3);
    assert_eq!(
        record.features.iter().map(|f| f.order).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    let cds = feature(record, "CDS");
    assert_eq!(cds.ranges.len(), 1);
    assert_eq!(cds.ranges[0].span, crate::data_structs::Span::new(101, 400));
    assert!(!cds.flags.partial);
}

#[rstest]
fn test_legacy_regulatory_key(assembler: FeatureAssembler) {
    let input = blocks(&[("promoter", "10..50", "/note=\"core\""), ("RBS", "60..65", "")]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    let converted = record
        .features
        .iter()
        .filter(|f| f.key == "regulatory")
        .map(|f| f.value_of(QualifierKind::RegulatoryClass).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(converted, vec!["promoter", "ribosome_binding_site"]);
    assert!(outcome.has_code(ErrorCode::RegulatoryConverted));
    assert_eq!(outcome.highest(), Some(Severity::Info));
}

#[rstest]
fn test_regulatory_class_checks(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("TATA_signal", "10..15", "/regulatory_class=\"promoter\""),
        ("regulatory", "20..30", "/regulatory_class=\"booster\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    assert!(outcome.has_code(ErrorCode::RegulatoryClassConflict));
    assert!(outcome.has_code(ErrorCode::InvalidRegulatoryClass));
    let kept = feature(record, "regulatory");
    assert_eq!(kept.location, "10..15");
    assert_eq!(kept.values_of(QualifierKind::RegulatoryClass), vec!["TATA_box"]);
    assert_eq!(record.features.len(), 2);
}

#[rstest]
fn test_unknown_key(assembler: FeatureAssembler) {
    let input = blocks(&[("mystery", "1..10", "/note=\"x\"")]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    assert_eq!(assembled(&outcome).features.len(), 1);
    assert!(outcome.has_code(ErrorCode::UnknownFeatureKey));
    assert_eq!(outcome.highest(), Some(Severity::Error));

    let strict = FeatureAssembler::new(AssemblerConfig::default().with_strict(true));
    let outcome = strict.assemble(&meta(), &input).unwrap();
    rejected_with(&outcome, ErrorCode::UnknownFeatureKey);
}

#[rstest]
fn test_grammar_drops(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("gene", "1..100", "/gene=\"abc\"\n/translation=\"MKV\""),
        ("ncRNA", "200..300", "/product=\"thing\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    let gene = feature(record, "gene");
    assert!(!gene.has(QualifierKind::Translation));
    assert!(outcome.has_code(ErrorCode::IllegalQualifier));
    assert!(outcome.has_code(ErrorCode::MissingMandatoryQualifier));
    assert!(record.features.iter().all(|f| f.key != "ncRNA"));
}

#[rstest]
fn test_legacy_evidence(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("CDS", "1..300", "/evidence=experimental\n/product=\"a\""),
        ("CDS", "400..600", "/evidence=not_experimental\n/product=\"b\""),
        ("CDS", "700..900", "/evidence=maybe\n/product=\"c\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    let cds = record
        .features
        .iter()
        .filter(|f| f.key == "CDS")
        .collect::<Vec<_>>();
    assert_eq!(
        cds[0].value_of(QualifierKind::Experiment),
        Some(rules::EXPERIMENT_PLACEHOLDER)
    );
    assert_eq!(
        cds[1].value_of(QualifierKind::Inference),
        Some(rules::INFERENCE_PLACEHOLDER)
    );
    assert!(cds.iter().all(|f| !f.has(QualifierKind::Evidence)));
    assert!(outcome.has_code(ErrorCode::LegacyEvidenceConverted));
    assert!(outcome.has_code(ErrorCode::InvalidEvidence));
}

#[rstest]
fn test_evidence_conflict(assembler: FeatureAssembler) {
    let input = blocks(&[(
        "CDS",
        "1..300",
        "/evidence=experimental\n/inference=\"ab initio prediction:GeneMark:2.0\"",
    )]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    rejected_with(&outcome, ErrorCode::EvidenceConflict);
    let reject = outcome.rejection().unwrap();
    assert_eq!(reject.context.location.as_deref(), Some("1..300"));
}

#[rstest]
fn test_pseudo_and_duplicates(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("gene", "1..100", "/gene=\"abc\"\n/pseudo\n/pseudogene=\"unitary\"\n/gene=\"abc\""),
        ("gene", "1..100", "/gene=\"abc\"\n/pseudo\n/pseudogene=\"unitary\""),
        ("gene", "200..300", "/gene=\"def\"\n/pseudogene=\"fake\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    let genes = record
        .features
        .iter()
        .filter(|f| f.key == "gene")
        .collect::<Vec<_>>();
    assert_eq!(genes.len(), 2);
    assert!(!genes[0].has(QualifierKind::Pseudo));
    assert!(genes[0].flags.pseudo);
    assert_eq!(genes[0].count_of(QualifierKind::Gene), 1);
    assert!(!genes[1].flags.pseudo);
    for code in [
        ErrorCode::PseudoAndPseudogene,
        ErrorCode::DuplicateQualifier,
        ErrorCode::DuplicateFeature,
        ErrorCode::InvalidPseudogene,
    ] {
        assert!(outcome.has_code(code), "missing {}", code);
    }
}

#[rstest]
#[case("16s rRNA gene", "16S ribosomal RNA")]
#[case("5.8s Ribosomal rna", "5.8S ribosomal RNA")]
#[case("23S ribosomal RNA", "23S ribosomal RNA")]
#[case("large  subunit rRNA", "large subunit ribosomal RNA")]
fn test_rrna_product(
    #[case] given: &str,
    #[case] expected: &str,
) {
    assert_eq!(normalize_rrna_product(given), expected);
}

#[rstest]
#[case("tRNA-Leu", Some("tRNA-Leu"))]
#[case("transfer RNA-Leu", Some("tRNA-Leu"))]
#[case("tRNA Gly", Some("tRNA-Gly"))]
#[case("tRNA-SEC", Some("tRNA-Sec"))]
#[case("tRNA-Foo", None)]
#[case("hypothetical protein", None)]
fn test_trna_product(
    #[case] given: &str,
    #[case] expected: Option<&str>,
) {
    assert_eq!(normalize_trna_product(given).as_deref(), expected);
}

#[rstest]
fn test_rna_features(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("rRNA", "1..200", "/product=\"16s rRNA\""),
        ("rRNA", "201..300", "/note=\"no product\""),
        (
            "tRNA",
            "301..380",
            "/product=\"transfer RNA-Leu\"\n/anticodon=\"(pos:334..336,aa:Leu,seq:caa)\"",
        ),
        (
            "tRNA",
            "401..480",
            "/product=\"tRNA-Leu\"\n/anticodon=\"(pos:434..436,aa:Gly,seq:ccc)\"\n/note=\"tRNA-Gly\"",
        ),
        ("tRNA", "501..580", "/product=\"tRNA-Ser\"\n/anticodon=\"(aa:Ser)\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    let rrna = feature(record, "rRNA");
    assert_eq!(rrna.value_of(QualifierKind::Product), Some("16S ribosomal RNA"));
    let trnas = record
        .features
        .iter()
        .filter(|f| f.key == "tRNA")
        .collect::<Vec<_>>();
    assert_eq!(trnas[0].value_of(QualifierKind::Product), Some("tRNA-Leu"));
    assert!(!trnas[2].has(QualifierKind::Anticodon));
    for code in [
        ErrorCode::RrnaProductNormalized,
        ErrorCode::MissingRrnaProduct,
        ErrorCode::TrnaProductNormalized,
        ErrorCode::AnticodonProductMismatch,
        ErrorCode::TrnaNoteMismatch,
        ErrorCode::InvalidAnticodon,
    ] {
        assert!(outcome.has_code(code), "missing {}", code);
    }
}

#[rstest]
fn test_operons(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("operon", "100..500", "/operon=\"lacZYA\""),
        ("gene", "120..300", "/gene=\"lacZ\"\n/operon=\"lacZYA\""),
        ("gene", "600..700", "/gene=\"other\"\n/operon=\"trpEDCBA\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    assert!(!outcome.is_rejected());
    assert!(outcome.has_code(ErrorCode::OperonNotFound));
}

#[rstest]
#[case::outside(
    vec![("operon", "100..500", "/operon=\"lacZYA\""), ("gene", "450..600", "/operon=\"lacZYA\"")],
    ErrorCode::OperonLocationMismatch
)]
#[case::duplicate(
    vec![("operon", "100..500", "/operon=\"lacZYA\""), ("operon", "600..900", "/operon=\"lacZYA\"")],
    ErrorCode::DuplicateOperon
)]
#[case::unnamed(vec![("operon", "100..500", "/note=\"x\"")], ErrorCode::OperonMissingName)]
#[case::two_names(
    vec![("operon", "100..500", "/operon=\"a\"\n/operon=\"b\"")],
    ErrorCode::MultipleOperonNames
)]
fn test_operon_rejects(
    assembler: FeatureAssembler,
    #[case] features: Vec<(&str, &str, &str)>,
    #[case] code: ErrorCode,
) {
    let outcome = assembler.assemble(&meta(), &blocks(&features)).unwrap();
    rejected_with(&outcome, code);
}

#[rstest]
#[case::two_tags(
    vec![("gene", "1..100", "/locus_tag=\"T1\"\n/locus_tag=\"T2\"")],
    ErrorCode::MultipleLocusTags
)]
#[case::old_without_new(vec![("gene", "1..100", "/old_locus_tag=\"T0\"")], ErrorCode::OldLocusTagWithoutNew)]
#[case::old_is_new(
    vec![("gene", "1..100", "/locus_tag=\"T1\"\n/old_locus_tag=\"T1\"")],
    ErrorCode::OldLocusTagMatchesNew
)]
#[case::old_is_other(
    vec![
        ("gene", "1..100", "/locus_tag=\"T1\""),
        ("gene", "200..300", "/locus_tag=\"T2\"\n/old_locus_tag=\"T1\""),
    ],
    ErrorCode::OldLocusTagCollision
)]
#[case::same_tag_genes(
    vec![("gene", "1..100", "/locus_tag=\"T1\""), ("gene", "200..300", "/locus_tag=\"T1\"")],
    ErrorCode::DuplicateLocusTag
)]
fn test_locus_tag_rejects(
    assembler: FeatureAssembler,
    #[case] features: Vec<(&str, &str, &str)>,
    #[case] code: ErrorCode,
) {
    let outcome = assembler.assemble(&meta(), &blocks(&features)).unwrap();
    rejected_with(&outcome, code);
}

#[rstest]
fn test_locus_tag_with_blank_dropped(assembler: FeatureAssembler) {
    let input = blocks(&[
        ("gene", "1..100", "/locus_tag=\"T 1\""),
        ("CDS", "1..100", "/locus_tag=\"T2\""),
        ("gene", "1..100", "/locus_tag=\"T2\""),
    ]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    assert!(outcome.has_code(ErrorCode::InvalidLocusTag));
    assert!(!record.features[1].has(QualifierKind::LocusTag));
}

#[rstest]
fn test_location_errors() {
    let input = blocks(&[
        ("CDS", "900..1200", "/product=\"past end\""),
        ("CDS", "join(1..10,XY999999.1:5..9)", "/product=\"remote\""),
        ("CDS", "<1..200", "/product=\"partial\""),
    ]);

    let outcome = FeatureAssembler::default()
        .assemble(&meta(), &input)
        .unwrap();
    let record = assembled(&outcome);
    assert_eq!(record.features.len(), 2);
    assert!(feature(record, "CDS").flags.partial);
    assert!(outcome.has_code(ErrorCode::LocationOutOfRange));
    assert!(outcome.has_code(ErrorCode::BadLocation));
    assert_eq!(outcome.highest(), Some(Severity::Error));

    let permissive = FeatureAssembler::new(AssemblerConfig::default().with_permissive_locations(true));
    let outcome = permissive.assemble(&meta(), &input).unwrap();
    assert_eq!(assembled(&outcome).features.len(), 4);
    assert_eq!(outcome.highest(), Some(Severity::Warning));
}

#[rstest]
fn test_source_drops_reach_feature_list(assembler: FeatureAssembler) {
    let input = vec![RawFeatureBlock::new(
        0,
        "source",
        "1..1000",
        "/organism=\"Homo sapiens\"\n/mol_type=\"genomic DNA\"\n/collection_date=\"31-Foo-2001\"\n/organelle=\"nowhere\"\n/PCR_primers=\"colour: red\"",
    )];
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    assert!(outcome.has_code(ErrorCode::InvalidCollectionDate));
    assert!(outcome.has_code(ErrorCode::IllegalOrganelle));
    assert!(outcome.has_code(ErrorCode::InvalidPcrPrimers));

    let record = assembled(&outcome);
    let names = feature(record, "source")
        .qualifiers
        .iter()
        .map(|q| q.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["organism", "mol_type"]);

    let again = assembler.assemble(&meta(), &record.to_blocks()).unwrap();
    assert!(again.diagnostics.is_empty(), "{:?}", again.diagnostics);
    assert_eq!(assembled(&again).features, record.features);
}

#[rstest]
fn test_no_source(assembler: FeatureAssembler) {
    let input = vec![RawFeatureBlock::new(0, "gene", "1..100", "/gene=\"abc\"")];
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    rejected_with(&outcome, ErrorCode::NoSourceFeature);
}

#[rstest]
fn test_molecule(assembler: FeatureAssembler) {
    let rna = meta().with_molecule(Some("mRNA".into()));
    let outcome = assembler.assemble(&rna, &blocks(&[])).unwrap();
    assert!(!outcome.is_rejected());
    assert!(outcome.has_code(ErrorCode::MolTypeMismatch));

    let broken = meta().with_molecule(Some("quartz".into()));
    let err = assembler
        .assemble(&broken, &blocks(&[]))
        .unwrap_err();
    let fatal = rejection(&err).unwrap();
    assert_eq!(fatal.severity, Severity::Fatal);
    assert_eq!(fatal.code, ErrorCode::UnparseableMolecule);
}

#[rstest]
fn test_batch() {
    let assembler = FeatureAssembler::default();
    let good = (meta(), blocks(&[]));
    let rejected = (meta(), vec![RawFeatureBlock::new(0, "gene", "1..100", "")]);
    let outcomes = assembler
        .assemble_batch(&[good.clone(), rejected.clone(), good.clone()])
        .unwrap();
    assert_eq!(
        outcomes.iter().map(|o| o.is_rejected()).collect::<Vec<_>>(),
        vec![false, true, false]
    );

    let fatal = (meta().with_molecule(Some("quartz".into())), blocks(&[]));
    assert!(assembler
        .assemble_batch(&[good, fatal, rejected])
        .is_err());
}

fn taxonomy(lineage: Option<&str>) -> Arc<dyn TaxonomyService> {
    Arc::new(StaticTaxonomy::new().with_entry(
        "homo sapiens",
        TaxonLookup::new("Homo sapiens", lineage.map(str::to_string), Some(9606)),
    ))
}

#[rstest]
fn test_taxonomy_lookup() {
    let assembler = FeatureAssembler::default().with_taxonomy(taxonomy(Some("Eukaryota; Metazoa")));
    let outcome = assembler.assemble(&meta(), &blocks(&[])).unwrap();
    let record = assembled(&outcome);
    assert!(record.descriptor.looked_up);
    assert_eq!(record.descriptor.taxon_id, Some(9606));
    assert_eq!(record.descriptor.lineage.as_deref(), Some("Eukaryota; Metazoa"));
    assert_eq!(
        record.sources[0].descriptor.as_ref(),
        Some(&record.descriptor)
    );

    let assembler = FeatureAssembler::default().with_taxonomy(taxonomy(None));
    let outcome = assembler.assemble(&meta(), &blocks(&[])).unwrap();
    rejected_with(&outcome, ErrorCode::MissingLineage);

    let patent = meta().with_is_patent(true);
    let outcome = assembler.assemble(&patent, &blocks(&[])).unwrap();
    assert!(!outcome.is_rejected());
    assert!(outcome.has_code(ErrorCode::MissingLineage));

    let unknown = FeatureAssembler::default().with_taxonomy(Arc::new(StaticTaxonomy::new()));
    let outcome = unknown.assemble(&meta(), &blocks(&[])).unwrap();
    assert!(outcome.has_code(ErrorCode::OrganismNotFound));
    assert!(!assembled(&outcome).descriptor.looked_up);
}

#[rstest]
fn test_shared_descriptors(assembler: FeatureAssembler) {
    let input = vec![
        RawFeatureBlock::new(
            0,
            "source",
            "1..600",
            "/organism=\"Homo sapiens\"\n/mol_type=\"genomic DNA\"\n/focus",
        ),
        RawFeatureBlock::new(
            1,
            "source",
            "601..1000",
            "/organism=\"Mus musculus\"\n/mol_type=\"genomic DNA\"\n/strain=\"C57BL\"",
        ),
        RawFeatureBlock::new(
            2,
            "source",
            "1..1000",
            "/organism=\"Mus musculus\"\n/mol_type=\"genomic DNA\"\n/strain=\"C57BL\"\n/transposon=\"Tn5\"",
        ),
    ];
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    let record = assembled(&outcome);
    assert_eq!(record.descriptor.taxname, "Homo sapiens");
    assert_eq!(record.sources[1].descriptor, record.sources[2].descriptor);
    assert_ne!(record.sources[0].descriptor, record.sources[1].descriptor);
}

#[derive(Default)]
struct Counting(Mutex<usize>);

impl DiagnosticSink for Counting {
    fn emit(
        &self,
        _diagnostic: &Diagnostic,
    ) {
        *self.0.lock().unwrap() += 1;
    }
}

#[rstest]
fn test_sink_sees_every_finding() {
    let sink = Arc::new(Counting::default());
    let assembler = FeatureAssembler::new(AssemblerConfig::default().with_sink(sink.clone()));
    let input = blocks(&[("promoter", "10..50", ""), ("mystery", "1..10", "")]);
    let outcome = assembler.assemble(&meta(), &input).unwrap();
    assert_eq!(*sink.0.lock().unwrap(), outcome.diagnostics.len());
    assert!(outcome.diagnostics.len() >= 2);
}
