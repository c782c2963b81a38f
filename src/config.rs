//! Per-run configuration and per-record metadata.

use std::sync::Arc;

use chrono::{
    NaiveDate,
    Utc,
};
use serde::Serialize;

use crate::data_structs::enums::{
    HtgPhase,
    SourceDb,
};
use crate::data_structs::ModifierUseSet;
use crate::diagnostics::{
    DiagnosticSink,
    LogSink,
};
use crate::{
    getter_fn,
    with_field_fn,
};

/// Settings shared read-only by every record of a run.
#[derive(Clone)]
pub struct AssemblerConfig {
    source_db:            SourceDb,
    /// Unknown feature keys reject the record instead of dropping the
    /// feature.
    strict:               bool,
    /// Keep features whose location resolved with errors.
    permissive_locations: bool,
    use_set:              ModifierUseSet,
    /// Dates after this are in the future; defaults to today (UTC).
    reference_date:       Option<NaiveDate>,
    sink:                 Arc<dyn DiagnosticSink>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            source_db:            SourceDb::default(),
            strict:               false,
            permissive_locations: false,
            use_set:              ModifierUseSet::default(),
            reference_date:       None,
            sink:                 Arc::new(LogSink),
        }
    }
}

impl std::fmt::Debug for AssemblerConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AssemblerConfig")
            .field("source_db", &self.source_db)
            .field("strict", &self.strict)
            .field("permissive_locations", &self.permissive_locations)
            .field("use_set", &self.use_set)
            .field("reference_date", &self.reference_date)
            .finish_non_exhaustive()
    }
}

impl AssemblerConfig {
    with_field_fn!(source_db, SourceDb);

    with_field_fn!(strict, bool);

    with_field_fn!(permissive_locations, bool);

    with_field_fn!(use_set, ModifierUseSet);

    with_field_fn!(reference_date, Option<NaiveDate>);

    with_field_fn!(sink, Arc<dyn DiagnosticSink>);

    getter_fn!(source_db, SourceDb);

    getter_fn!(use_set, ModifierUseSet);

    getter_fn!(sink, Arc<dyn DiagnosticSink>);

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn permissive_locations(&self) -> bool {
        self.permissive_locations
    }

    /// The configured reference date, or today's date.
    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// What the surrounding converter knows about the record whose feature table
/// is being processed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordMeta {
    accession:       String,
    sequence_length: u32,
    /// Three-letter division code (`PAT`, `SYN`, `BCT`, ...).
    division:        Option<String>,
    htg_phase:       HtgPhase,
    is_patent:       bool,
    /// Molecule type from the LOCUS/ID line, unparsed.
    molecule:        Option<String>,
    /// Identifiers the record's own sequence is known under; remote
    /// location references must name one of them.
    sequence_ids:    Vec<String>,
}

impl RecordMeta {
    pub fn new<S: Into<String>>(
        accession: S,
        sequence_length: u32,
    ) -> Self {
        let accession = accession.into();
        Self {
            sequence_ids: vec![accession.clone()],
            accession,
            sequence_length,
            ..Default::default()
        }
    }

    with_field_fn!(division, Option<String>);

    with_field_fn!(htg_phase, HtgPhase);

    with_field_fn!(is_patent, bool);

    with_field_fn!(molecule, Option<String>);

    with_field_fn!(sequence_ids, Vec<String>);

    getter_fn!(accession, String);

    getter_fn!(division, Option<String>);

    getter_fn!(htg_phase, HtgPhase);

    getter_fn!(molecule, Option<String>);

    getter_fn!(sequence_ids, Vec<String>);

    pub fn sequence_length(&self) -> u32 {
        self.sequence_length
    }

    pub fn is_patent(&self) -> bool {
        self.is_patent
    }

    /// Patent and synthetic divisions tolerate organisms without lineage.
    pub fn lineage_optional(&self) -> bool {
        self.is_patent
            || matches!(self.division.as_deref(), Some("PAT") | Some("SYN"))
    }
}
