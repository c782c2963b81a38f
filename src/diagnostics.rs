//! Validation findings and where they go.
//!
//! Every component receives a `&mut Diagnostics` for the record being
//! processed. Findings are recorded there and forwarded to the configured
//! [`DiagnosticSink`] at the moment they are raised, together with the
//! feature context (key plus a truncated location) they refer to.
//!
//! A `Reject` or `Fatal` finding aborts the record: [`Diagnostics::reject`]
//! records the finding and returns it as an [`anyhow::Error`], which the
//! caller propagates with `?`. The original [`Diagnostic`] can be recovered
//! with `err.downcast_ref::<Diagnostic>()`.

use std::fmt::Display;
use std::sync::Arc;

use log::{
    error,
    info,
    warn,
};
use serde::Serialize;

use crate::data_structs::enums::Severity;
use crate::data_structs::ParsedFeature;
use crate::utils::truncate_location;

/// Machine-readable identifier of a finding. Rendered as
/// `CATEGORY.Name`, e.g. `SOURCE.IncompleteCoverage`.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize)]
pub enum ErrorCode {
    // Qualifier tokenizing
    UnbalancedQuotes,
    MalformedQualifier,
    StrayText,
    NoteEmbedsQualifier,
    NoteUnbalancedQuotes,
    MissingQualifierValue,
    UnexpectedQualifierValue,
    DuplicateQualifier,

    // Grammar
    UnknownFeatureKey,
    IllegalQualifier,
    MissingMandatoryQualifier,

    // Locations
    BadLocation,
    LocationOutOfRange,

    // Source features
    NoSourceFeature,
    MissingOrganism,
    MultipleOrganisms,
    GenomeKeywordOnly,
    IllegalOrganelle,
    DuplicateMolType,
    InvalidMolType,
    MolTypesDiffer,
    MolTypeMismatch,
    InvalidTaxonXref,
    ConflictingTaxonIds,
    FocusAndTransgenic,
    GermlineAndRearranged,
    MetagenomicWithoutEnvSample,
    EnvSampleWithoutSource,
    InvalidPcrPrimers,
    PcrPrimerFieldOrder,
    InvalidCollectionDate,
    FutureCollectionDate,
    UnparseableSourceLocation,
    SourceOutOfRange,
    SourceOverlap,
    IncompleteCoverage,
    ExcessCoverage,
    SingleSourceNotFull,
    MultipleTransgenic,
    TransgenicNotFull,
    MultipleFocusOrganisms,
    NoDescriptorSource,
    FocusMissing,
    OrganismNotFound,
    MissingLineage,

    // Gaps
    GapLocation,
    GapOutOfRange,
    MissingEstimatedLength,
    InvalidEstimatedLength,
    GapLengthMismatch,
    UnknownGapLength,
    MissingGapType,
    InvalidGapType,
    MissingLinkageEvidence,
    InvalidLinkageEvidence,
    IllegalLinkageEvidence,
    MixedGapFeatures,
    HtgLinkageEvidence,
    OverlappingGaps,
    ContiguousGaps,

    // Feature-level rules
    DuplicateFeature,
    PseudoAndPseudogene,
    InvalidPseudogene,
    EvidenceConflict,
    InvalidEvidence,
    LegacyEvidenceConverted,
    RegulatoryConverted,
    RegulatoryClassConflict,
    InvalidRegulatoryClass,
    RrnaProductNormalized,
    MissingRrnaProduct,
    TrnaProductNormalized,
    TrnaProductUnrecognized,
    InvalidAnticodon,
    AnticodonProductMismatch,
    TrnaNoteMismatch,
    OperonMissingName,
    MultipleOperonNames,
    DuplicateOperon,
    OperonLocationMismatch,
    OperonNotFound,
    MultipleLocusTags,
    OldLocusTagWithoutNew,
    OldLocusTagMatchesNew,
    OldLocusTagCollision,
    DuplicateLocusTag,
    InvalidLocusTag,

    // Record-level
    UnparseableMolecule,
}

impl ErrorCode {
    pub fn category(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            UnbalancedQuotes | MalformedQualifier | StrayText | NoteEmbedsQualifier
            | NoteUnbalancedQuotes | MissingQualifierValue | UnexpectedQualifierValue
            | DuplicateQualifier | IllegalQualifier | MissingMandatoryQualifier => "QUALIFIER",
            BadLocation | LocationOutOfRange => "LOCATION",
            NoSourceFeature | MissingOrganism | MultipleOrganisms | GenomeKeywordOnly
            | IllegalOrganelle | DuplicateMolType | InvalidMolType | MolTypesDiffer
            | MolTypeMismatch | InvalidTaxonXref | ConflictingTaxonIds | FocusAndTransgenic
            | GermlineAndRearranged | MetagenomicWithoutEnvSample | EnvSampleWithoutSource
            | InvalidPcrPrimers | PcrPrimerFieldOrder | InvalidCollectionDate
            | FutureCollectionDate | UnparseableSourceLocation | SourceOutOfRange
            | SourceOverlap | IncompleteCoverage | ExcessCoverage | SingleSourceNotFull
            | MultipleTransgenic | TransgenicNotFull | MultipleFocusOrganisms
            | NoDescriptorSource | FocusMissing => "SOURCE",
            OrganismNotFound | MissingLineage => "ORGANISM",
            GapLocation | GapOutOfRange | MissingEstimatedLength | InvalidEstimatedLength
            | GapLengthMismatch | UnknownGapLength | MissingGapType | InvalidGapType
            | MissingLinkageEvidence | InvalidLinkageEvidence | IllegalLinkageEvidence
            | MixedGapFeatures | HtgLinkageEvidence | OverlappingGaps | ContiguousGaps => "GAP",
            UnparseableMolecule => "ENTRY",
            _ => "FEATURE",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}.{:?}", self.category(), self)
    }
}

/// Where a finding applies: the record and, when known, one feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticContext {
    pub accession:   String,
    pub feature_key: Option<String>,
    pub location:    Option<String>,
}

impl Display for DiagnosticContext {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.accession)?;
        match (&self.feature_key, &self.location) {
            (Some(key), Some(loc)) => write!(f, ": {} {}", key, loc),
            (Some(key), None) => write!(f, ": {}", key),
            (None, Some(loc)) => write!(f, ": {}", loc),
            (None, None) => Ok(()),
        }
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("[{severity}] {code} {context}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code:     ErrorCode,
    pub message:  String,
    pub context:  DiagnosticContext,
}

/// Receives every finding as it is raised.
pub trait DiagnosticSink: Send + Sync {
    fn emit(
        &self,
        diagnostic: &Diagnostic,
    );
}

/// Forwards findings to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(
        &self,
        diagnostic: &Diagnostic,
    ) {
        match diagnostic.severity {
            Severity::Info => info!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Error | Severity::Reject | Severity::Fatal => error!("{}", diagnostic),
        }
    }
}

/// Per-record collection of findings.
pub struct Diagnostics {
    accession: String,
    entries:   Vec<Diagnostic>,
    sink:      Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("accession", &self.accession)
            .field("entries", &self.entries)
            .finish()
    }
}

impl Diagnostics {
    pub fn new<S: Into<String>>(accession: S) -> Self {
        Self::with_sink(accession, Arc::new(LogSink))
    }

    pub fn with_sink<S: Into<String>>(
        accession: S,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            accession: accession.into(),
            entries: Vec::new(),
            sink,
        }
    }

    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// Context pointing at a feature by key and location.
    pub fn context(
        &self,
        key: &str,
        location: &str,
    ) -> DiagnosticContext {
        DiagnosticContext {
            accession:   self.accession.clone(),
            feature_key: Some(key.to_string()),
            location:    Some(truncate_location(location)),
        }
    }

    pub fn feature_context(
        &self,
        feature: &ParsedFeature,
    ) -> DiagnosticContext {
        self.context(&feature.key, &feature.location)
    }

    pub fn record_context(&self) -> DiagnosticContext {
        DiagnosticContext {
            accession: self.accession.clone(),
            ..Default::default()
        }
    }

    /// Records a finding and forwards it to the sink.
    pub fn push<M: Into<String>>(
        &mut self,
        severity: Severity,
        code: ErrorCode,
        context: DiagnosticContext,
        message: M,
    ) -> &Diagnostic {
        let diagnostic = Diagnostic {
            severity,
            code,
            message: message.into(),
            context,
        };
        self.sink.emit(&diagnostic);
        self.entries.push(diagnostic);
        &self.entries[self.entries.len() - 1]
    }

    pub fn info<M: Into<String>>(
        &mut self,
        code: ErrorCode,
        context: DiagnosticContext,
        message: M,
    ) {
        self.push(Severity::Info, code, context, message);
    }

    pub fn warn<M: Into<String>>(
        &mut self,
        code: ErrorCode,
        context: DiagnosticContext,
        message: M,
    ) {
        self.push(Severity::Warning, code, context, message);
    }

    pub fn error<M: Into<String>>(
        &mut self,
        code: ErrorCode,
        context: DiagnosticContext,
        message: M,
    ) {
        self.push(Severity::Error, code, context, message);
    }

    /// Records a `Reject` finding and returns it as an error for the caller
    /// to propagate.
    pub fn reject<M: Into<String>>(
        &mut self,
        code: ErrorCode,
        context: DiagnosticContext,
        message: M,
    ) -> anyhow::Error {
        let diagnostic = self
            .push(Severity::Reject, code, context, message)
            .clone();
        anyhow::Error::new(diagnostic)
    }

    /// Records a `Fatal` finding and returns it as an error.
    pub fn fatal<M: Into<String>>(
        &mut self,
        code: ErrorCode,
        context: DiagnosticContext,
        message: M,
    ) -> anyhow::Error {
        let diagnostic = self
            .push(Severity::Fatal, code, context, message)
            .clone();
        anyhow::Error::new(diagnostic)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Most severe finding recorded so far.
    pub fn highest(&self) -> Option<Severity> {
        self.entries
            .iter()
            .map(|d| d.severity)
            .max()
    }

    pub fn has_code(
        &self,
        code: ErrorCode,
    ) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    /// Findings at or above `severity`.
    pub fn at_least(
        &self,
        severity: Severity,
    ) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(move |d| d.severity >= severity)
    }
}

/// Recovers the rejecting finding from an error returned by a pipeline
/// stage, if the error carries one.
pub fn rejection(err: &anyhow::Error) -> Option<&Diagnostic> {
    err.downcast_ref::<Diagnostic>()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<Severity>>);

    impl DiagnosticSink for Collecting {
        fn emit(
            &self,
            diagnostic: &Diagnostic,
        ) {
            self.0.lock().unwrap().push(diagnostic.severity);
        }
    }

    #[test]
    fn test_reject_is_recorded_and_returned() {
        let sink = Arc::new(Collecting::default());
        let mut diags = Diagnostics::with_sink("AB000001", sink.clone());
        let ctx = diags.context("source", "1..100");
        diags.warn(ErrorCode::StrayText, ctx.clone(), "stray");
        let err = diags.reject(ErrorCode::IncompleteCoverage, ctx, "not covered");

        let found = rejection(&err).unwrap();
        assert_eq!(found.code, ErrorCode::IncompleteCoverage);
        assert_eq!(found.context.location.as_deref(), Some("1..100"));
        assert_eq!(diags.highest(), Some(Severity::Reject));
        assert_eq!(*sink.0.lock().unwrap(), vec![Severity::Warning, Severity::Reject]);
    }

    #[test]
    fn test_context_truncates_location() {
        let diags = Diagnostics::new("X");
        let loc = "join(".to_string() + &"100..200,".repeat(10) + "300..400)";
        let ctx = diags.context("CDS", &loc);
        assert!(ctx.location.unwrap().chars().count() <= 50);
    }

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::IncompleteCoverage.to_string(), "SOURCE.IncompleteCoverage");
        assert_eq!(ErrorCode::OverlappingGaps.to_string(), "GAP.OverlappingGaps");
        assert_eq!(ErrorCode::DuplicateOperon.to_string(), "FEATURE.DuplicateOperon");
    }
}
