pub use crate::assembly::{
    AssembledRecord,
    FeatureAssembler,
    RecordOutcome,
};
pub use crate::collaborators::{
    InsdcLocationResolver,
    LocationResolver,
    OfflineTaxonomy,
    QualifierGrammar,
    QualifierSet,
    ResolvedLocation,
    StaticQualifierGrammar,
    StaticTaxonomy,
    TaxonLookup,
    TaxonomyService,
};
pub use crate::config::{
    AssemblerConfig,
    RecordMeta,
};
pub use crate::data_structs::enums::{
    GapType,
    GenomeCode,
    HtgPhase,
    LinkageEvidence,
    MolType,
    RecordMolecule,
    Severity,
    SourceDb,
    Strand,
};
pub use crate::data_structs::{
    FeatureFlags,
    GapFeatureRecord,
    GapLength,
    ModifierKind,
    ModifierUseSet,
    OrganismDescriptor,
    ParsedFeature,
    Qualifier,
    QualifierKind,
    QualifierList,
    RawFeatureBlock,
    SeqRange,
    SourceFeatureRecord,
    Span,
};
pub use crate::diagnostics::{
    rejection,
    Diagnostic,
    DiagnosticContext,
    DiagnosticSink,
    Diagnostics,
    ErrorCode,
    LogSink,
};
pub use crate::gap::GapFeatureValidator;
pub use crate::source::{
    Consolidation,
    CoverageValidator,
    SourceConsolidator,
    SourceFeatureCollector,
};
pub use crate::tokenizer::QualifierTokenizer;
