//! Turning the raw feature blocks of one record into its validated feature
//! list and organism descriptor.
//!
//! [`FeatureAssembler::assemble_with`] runs the stages in a fixed order:
//!
//! 1. tokenize every block;
//! 2. per feature: legacy key conversion, grammar check, qualifier rules,
//!    RNA product normalization;
//! 3. duplicate feature removal;
//! 4. the source pass (collect, check coverage, consolidate) and the gap
//!    pass;
//! 5. location resolution;
//! 6. operon and locus tag checks across the record;
//! 7. taxonomy lookup for the descriptor.
//!
//! The surviving features are returned in their original order. A `Reject`
//! anywhere discards the record; a `Fatal` finding also aborts a batch run
//! through [`FeatureAssembler::assemble_batch`].

pub mod locus;
pub mod operon;
pub mod regulatory;
pub mod rna;
pub mod rules;

use std::sync::Arc;

use hashbrown::HashMap;
use log::{
    debug,
    info,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::collaborators::{
    InsdcLocationResolver,
    LocationResolver,
    OfflineTaxonomy,
    QualifierGrammar,
    TaxonomyService,
    DEFAULT_GRAMMAR,
};
use crate::config::{
    AssemblerConfig,
    RecordMeta,
};
use crate::data_structs::enums::{
    RecordMolecule,
    Severity,
};
use crate::data_structs::{
    GapFeatureRecord,
    OrganismDescriptor,
    ParsedFeature,
    QualifierKind,
    QualifierList,
    RawFeatureBlock,
    SourceFeatureRecord,
};
use crate::diagnostics::{
    rejection,
    Diagnostic,
    Diagnostics,
    ErrorCode,
};
use crate::gap::GapFeatureValidator;
use crate::source::{
    Consolidation,
    CoverageValidator,
    SourceConsolidator,
    SourceFeatureCollector,
};
use crate::tokenizer::QualifierTokenizer;
use crate::utils::{
    n_threads,
    THREAD_POOL,
};
use crate::with_field_fn;

#[cfg(test)]
mod tests;

/// The validated content of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledRecord {
    pub accession:         String,
    /// Record-level organism descriptor.
    pub descriptor:        OrganismDescriptor,
    /// The source feature (possibly merged) the descriptor was built from.
    pub descriptor_source: SourceFeatureRecord,
    /// `index` of every source feature sharing the descriptor's organism.
    pub members:           Vec<usize>,
    /// Every source feature, each with its own descriptor attached.
    pub sources:           Vec<SourceFeatureRecord>,
    /// Surviving features in original order, source features included.
    pub features:          Vec<ParsedFeature>,
    pub gaps:              Vec<GapFeatureRecord>,
}

impl AssembledRecord {
    /// Re-serializes the feature list so it can be run through the
    /// assembler again.
    pub fn to_blocks(&self) -> Vec<RawFeatureBlock> {
        self.features
            .iter()
            .map(RawFeatureBlock::from)
            .collect()
    }
}

/// Result of assembling one record: the record unless it was rejected, and
/// every finding raised along the way.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub accession:   String,
    pub record:      Option<AssembledRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordOutcome {
    pub fn is_rejected(&self) -> bool {
        self.record.is_none()
    }

    /// The finding that rejected the record, if any.
    pub fn rejection(&self) -> Option<&Diagnostic> {
        self.diagnostics
            .iter()
            .find(|d| d.severity.aborts_record())
    }

    pub fn highest(&self) -> Option<Severity> {
        self.diagnostics
            .iter()
            .map(|d| d.severity)
            .max()
    }

    pub fn has_code(
        &self,
        code: ErrorCode,
    ) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

/// Runs the whole pipeline for records. Holds only read-only state and can
/// be shared across worker threads.
#[derive(Clone)]
pub struct FeatureAssembler {
    config:   AssemblerConfig,
    resolver: Arc<dyn LocationResolver>,
    grammar:  Arc<dyn QualifierGrammar>,
    taxonomy: Arc<dyn TaxonomyService>,
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

impl FeatureAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            resolver: Arc::new(InsdcLocationResolver),
            grammar: Arc::new(DEFAULT_GRAMMAR.clone()),
            taxonomy: Arc::new(OfflineTaxonomy),
        }
    }

    with_field_fn!(resolver, Arc<dyn LocationResolver>);

    with_field_fn!(grammar, Arc<dyn QualifierGrammar>);

    with_field_fn!(taxonomy, Arc<dyn TaxonomyService>);

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assembles one record. A rejected record yields an outcome without a
    /// record; a fatal finding is returned as the error.
    pub fn assemble(
        &self,
        meta: &RecordMeta,
        blocks: &[RawFeatureBlock],
    ) -> anyhow::Result<RecordOutcome> {
        let mut diags = Diagnostics::with_sink(meta.accession().as_str(), self.config.sink().clone());
        let record = match self.assemble_with(meta, blocks, &mut diags) {
            Ok(record) => Some(record),
            Err(e) => {
                let code = rejection(&e)
                    .filter(|d| d.severity == Severity::Reject)
                    .map(|d| d.code);
                let Some(code) = code
                else {
                    return Err(e);
                };
                info!("{}: record rejected ({})", meta.accession(), code);
                None
            },
        };
        Ok(RecordOutcome {
            accession: meta.accession().clone(),
            record,
            diagnostics: diags.into_entries(),
        })
    }

    /// Assembles independent records on the shared thread pool. Outcomes
    /// are returned in input order; a fatal finding in any record fails the
    /// whole batch.
    pub fn assemble_batch(
        &self,
        records: &[(RecordMeta, Vec<RawFeatureBlock>)],
    ) -> anyhow::Result<Vec<RecordOutcome>> {
        debug!(
            "Assembling {} records on {} threads",
            records.len(),
            n_threads()
        );
        THREAD_POOL.install(|| {
            records
                .par_iter()
                .map(|(meta, blocks)| self.assemble(meta, blocks))
                .collect::<anyhow::Result<Vec<_>>>()
        })
    }

    /// Runs every stage for one record, recording findings in `diags`.
    pub fn assemble_with(
        &self,
        meta: &RecordMeta,
        blocks: &[RawFeatureBlock],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<AssembledRecord> {
        let molecule = self.molecule(meta, diags)?;

        let tokenizer = QualifierTokenizer::new(self.grammar.as_ref());
        let mut features = Vec::with_capacity(blocks.len());
        for feature in tokenizer.tokenize_all(blocks, diags) {
            if let Some(feature) = self.apply_feature_rules(feature, diags)? {
                features.push(feature);
            }
        }
        let mut features = rules::dedupe_features(features, diags);

        let (consolidation, mut sources) = self.source_pass(meta, molecule, &mut features, diags)?;
        let gaps = GapFeatureValidator::new(
            *self.config.source_db(),
            *meta.htg_phase(),
            meta.sequence_length(),
        )
        .validate(&features, diags)?;

        features = self.resolve_locations(meta, features, diags);
        operon::check_operons(&features, diags)?;
        locus::check_locus_tags(&mut features, diags)?;

        let mut descriptor = OrganismDescriptor::from_record(&consolidation.chosen);
        self.look_up(&mut descriptor, &consolidation.chosen, meta, diags)?;
        self.attach_descriptors(&mut sources);

        features.sort_by_key(|f| f.order);
        debug!(
            "{}: assembled {} features, {} gaps, descriptor \"{}\"",
            meta.accession(),
            features.len(),
            gaps.len(),
            descriptor
        );
        Ok(AssembledRecord {
            accession: meta.accession().clone(),
            descriptor,
            descriptor_source: consolidation.chosen,
            members: consolidation.members,
            sources,
            features,
            gaps,
        })
    }

    fn molecule(
        &self,
        meta: &RecordMeta,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Option<RecordMolecule>> {
        let Some(raw) = meta.molecule()
        else {
            return Ok(None);
        };
        raw.parse::<RecordMolecule>().map(Some).map_err(|e| {
            let ctx = diags.record_context();
            diags.fatal(ErrorCode::UnparseableMolecule, ctx, e.to_string())
        })
    }

    /// Per-feature stage. Returns `None` when the feature is dropped.
    fn apply_feature_rules(
        &self,
        mut feature: ParsedFeature,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Option<ParsedFeature>> {
        if !regulatory::convert_regulatory(&mut feature, diags) {
            return Ok(None);
        }

        let Some(legal) = self.grammar.legal_qualifiers(&feature.key)
        else {
            let ctx = diags.feature_context(&feature);
            let message = format!("Unknown feature key {} at {}", feature.key, feature.location);
            if self.config.strict() {
                return Err(diags.reject(ErrorCode::UnknownFeatureKey, ctx, message));
            }
            diags.error(ErrorCode::UnknownFeatureKey, ctx, message + ", dropped");
            return Ok(None);
        };

        rules::convert_evidence(&mut feature, diags)?;
        if !rules::check_grammar(&mut feature, &legal, diags) {
            return Ok(None);
        }
        rules::resolve_pseudo(&mut feature, diags);
        rules::dedupe_qualifiers(&mut feature, diags);
        rna::normalize_rrna(&mut feature, diags);
        rna::check_trna(&mut feature, diags);
        feature.flags.exception =
            feature.has(QualifierKind::Exception) || feature.has(QualifierKind::RibosomalSlippage);
        Ok(Some(feature))
    }

    fn source_pass(
        &self,
        meta: &RecordMeta,
        molecule: Option<RecordMolecule>,
        features: &mut [ParsedFeature],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<(Consolidation, Vec<SourceFeatureRecord>)> {
        let collector = SourceFeatureCollector::new(*self.config.use_set(), self.config.today());
        let mut sources = collector.collect(features, diags)?;

        // Qualifiers the collector dropped leave the feature list too.
        for record in &sources {
            if let Some(feature) = features
                .iter_mut()
                .find(|f| f.order == record.order && f.is_source())
            {
                if feature.qualifiers != record.qualifiers {
                    feature.qualifiers = record.qualifiers.clone();
                }
            }
        }

        if let Some(molecule) = molecule {
            for record in &sources {
                let Some(mol_type) = record.mol_type
                else {
                    continue;
                };
                if !molecule.accepts(mol_type) {
                    let ctx = diags.context("source", &record.location);
                    diags.warn(
                        ErrorCode::MolTypeMismatch,
                        ctx,
                        format!(
                            "/mol_type \"{}\" at {} does not fit the record molecule {:?}",
                            mol_type, record.location, molecule
                        ),
                    );
                }
            }
        }

        CoverageValidator::new(meta.sequence_length()).validate(&mut sources, diags)?;
        let consolidation = SourceConsolidator::new(meta.sequence_length()).consolidate(&sources, diags)?;
        Ok((consolidation, sources))
    }

    /// Fills in `ranges` and the partial flag. Features whose location has
    /// errors are dropped unless locations are permissive; source and gap
    /// features have already been checked by their own passes and are kept.
    fn resolve_locations(
        &self,
        meta: &RecordMeta,
        features: Vec<ParsedFeature>,
        diags: &mut Diagnostics,
    ) -> Vec<ParsedFeature> {
        let length = meta.sequence_length();
        let mut kept = Vec::with_capacity(features.len());
        for mut feature in features {
            let resolved = self
                .resolver
                .resolve(&feature.location, meta.sequence_ids());
            let past_end = resolved
                .ranges
                .iter()
                .filter(|r| r.span.end() > length)
                .count();
            let errors = resolved.error_count + past_end;

            feature.flags.partial = resolved.fuzzy || feature.has(QualifierKind::Partial);
            feature.ranges = resolved.ranges;

            if errors == 0 {
                kept.push(feature);
                continue;
            }
            let ctx = diags.feature_context(&feature);
            let code = if resolved.error_count > 0 {
                ErrorCode::BadLocation
            }
            else {
                ErrorCode::LocationOutOfRange
            };
            let message = format!(
                "{} location {} has {} error(s) (sequence length {})",
                feature.key, feature.location, errors, length
            );
            if self.config.permissive_locations() || feature.is_source() || feature.is_gap() {
                diags.warn(code, ctx, message);
                kept.push(feature);
            }
            else {
                diags.error(code, ctx, message + ", feature dropped");
            }
        }
        kept
    }

    /// Fills the descriptor from the taxonomy service.
    fn look_up(
        &self,
        descriptor: &mut OrganismDescriptor,
        chosen: &SourceFeatureRecord,
        meta: &RecordMeta,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        if !self.taxonomy.is_available() {
            return Ok(());
        }
        let ctx = diags.context("source", &chosen.location);
        let Some(hit) = self.taxonomy.resolve(&descriptor.taxname)
        else {
            diags.warn(
                ErrorCode::OrganismNotFound,
                ctx,
                format!("Organism \"{}\" not found in taxonomy", descriptor.taxname),
            );
            return Ok(());
        };

        descriptor.taxname = hit.canonical_name;
        descriptor.lineage = hit.lineage;
        descriptor.taxon_id = hit.taxon_id.or(descriptor.taxon_id);
        descriptor.looked_up = true;

        if descriptor.lineage.is_none() {
            let message = format!(
                "Organism \"{}\" at {} has no lineage",
                descriptor.taxname, chosen.location
            );
            if meta.lineage_optional() {
                diags.warn(ErrorCode::MissingLineage, ctx, message);
            }
            else {
                return Err(diags.reject(ErrorCode::MissingLineage, ctx, message));
            }
        }
        Ok(())
    }

    /// Gives every source feature its own descriptor. Features with the
    /// same disambiguation key share one value.
    fn attach_descriptors(
        &self,
        sources: &mut [SourceFeatureRecord],
    ) {
        let mut built: HashMap<String, OrganismDescriptor> = HashMap::new();
        for record in sources.iter_mut() {
            let descriptor = built
                .entry(record.key.clone())
                .or_insert_with(|| {
                    let mut descriptor = OrganismDescriptor::from_record(record);
                    if let Some(hit) = self.taxonomy.resolve(&record.organism) {
                        descriptor.taxname = hit.canonical_name;
                        descriptor.lineage = hit.lineage;
                        descriptor.taxon_id = hit.taxon_id.or(descriptor.taxon_id);
                        descriptor.looked_up = true;
                    }
                    descriptor
                })
                .clone();
            record.descriptor = Some(descriptor);
        }
        debug!(
            "Attached {} distinct descriptors to {} source features",
            built.len(),
            sources.len()
        );
    }
}
