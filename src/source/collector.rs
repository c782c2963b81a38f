use chrono::NaiveDate;
use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;

use crate::data_structs::enums::{
    GenomeCode,
    MolType,
};
use crate::data_structs::typedef::TaxonId;
use crate::data_structs::{
    ModifierUseSet,
    ParsedFeature,
    QualifierKind,
    QualifierList,
    SourceFeatureRecord,
};
use crate::diagnostics::{
    DiagnosticContext,
    Diagnostics,
    ErrorCode,
};
use crate::source::attrs::{
    is_future,
    parse_collection_date,
    parse_pcr_primers,
    PrimerError,
};
use crate::utils::{
    collapse_blanks,
    find_word_ci,
};

/// Pulls the organism attributes out of every `source` feature of a record.
pub struct SourceFeatureCollector {
    use_set: ModifierUseSet,
    today:   NaiveDate,
}

impl SourceFeatureCollector {
    pub fn new(
        use_set: ModifierUseSet,
        today: NaiveDate,
    ) -> Self {
        Self { use_set, today }
    }

    /// Builds one [`SourceFeatureRecord`] per `source` feature, in input
    /// order. Non-source features are ignored.
    pub fn collect(
        &self,
        features: &[ParsedFeature],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Vec<SourceFeatureRecord>> {
        let mut records = Vec::new();
        for feature in features.iter().filter(|f| f.is_source()) {
            let record = self.collect_one(records.len(), feature, diags)?;
            records.push(record);
        }
        self.check_across(&records, diags)?;
        debug!(
            "{}: collected {} source features",
            diags.accession(),
            records.len()
        );
        Ok(records)
    }

    fn collect_one(
        &self,
        index: usize,
        feature: &ParsedFeature,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<SourceFeatureRecord> {
        let ctx = diags.feature_context(feature);
        let mut qualifiers = feature.qualifiers.clone();

        let organisms = feature.values_of(QualifierKind::Organism);
        let raw_organism = match organisms.as_slice() {
            [] => {
                return Err(diags.reject(
                    ErrorCode::MissingOrganism,
                    ctx,
                    format!("Source feature at {} has no /organism", feature.location),
                ))
            },
            [one] => collapse_blanks(one),
            _ => {
                return Err(diags.reject(
                    ErrorCode::MultipleOrganisms,
                    ctx,
                    format!("Source feature at {} has more than one /organism", feature.location),
                ))
            },
        };
        let (organism, keyword_genome) = split_genome_keyword(&raw_organism);
        if organism.is_empty() {
            return Err(diags.reject(
                ErrorCode::GenomeKeywordOnly,
                ctx,
                format!(
                    "/organism \"{}\" at {} names a genome but no organism",
                    raw_organism, feature.location
                ),
            ));
        }

        let modifiers = self
            .use_set
            .iter()
            .filter_map(|m| {
                feature
                    .value_of(m.qualifier_kind())
                    .map(|v| (m, collapse_blanks(v)))
            })
            .collect_vec();
        let key = SourceFeatureRecord::make_key(&organism, &modifiers);

        let (organelle, organelle_genome) = match feature.value_of(QualifierKind::Organelle) {
            Some(value) => {
                match GenomeCode::from_organelle(value) {
                    Ok(code) => (Some(value.to_string()), code),
                    Err(e) => {
                        diags.error(ErrorCode::IllegalOrganelle, ctx.clone(), e.to_string());
                        qualifiers.retain(|q| q.kind != QualifierKind::Organelle);
                        (None, None)
                    },
                }
            },
            None => (None, None),
        };
        let genome = keyword_genome.or(organelle_genome).or_else(|| {
            if feature.has(QualifierKind::Macronuclear) {
                Some(GenomeCode::Macronuclear)
            }
            else if feature.has(QualifierKind::Plasmid) {
                Some(GenomeCode::Plasmid)
            }
            else {
                None
            }
        });

        let mol_type = self.mol_type(feature, &ctx, diags)?;
        let taxon_id = self.taxon_id(feature, &ctx, diags)?;

        let focus = feature.has(QualifierKind::Focus);
        let transgenic = feature.has(QualifierKind::Transgenic);
        let environmental_sample = feature.has(QualifierKind::EnvironmentalSample);
        self.check_flags(feature, &ctx, diags)?;

        let mut pcr_primers = Vec::new();
        for value in feature.values_of(QualifierKind::PcrPrimers) {
            match parse_pcr_primers(value) {
                Ok(set) => pcr_primers.push(set),
                Err(e @ (PrimerError::FieldOrder(_) | PrimerError::MissingSequence(_))) => {
                    return Err(diags.reject(
                        ErrorCode::PcrPrimerFieldOrder,
                        ctx,
                        format!("/PCR_primers at {}: {}", feature.location, e),
                    ));
                },
                Err(e) => {
                    diags.error(
                        ErrorCode::InvalidPcrPrimers,
                        ctx.clone(),
                        format!("/PCR_primers \"{}\" dropped: {}", value, e),
                    );
                    qualifiers.retain(|q| !(q.kind == QualifierKind::PcrPrimers && q.value_str() == value));
                },
            }
        }

        let mut collection_date = None;
        if let Some(value) = feature.value_of(QualifierKind::CollectionDate) {
            match parse_collection_date(value) {
                Ok(date) if is_future(&date, self.today) => {
                    diags.error(
                        ErrorCode::FutureCollectionDate,
                        ctx.clone(),
                        format!("/collection_date \"{}\" is in the future", value),
                    );
                    collection_date = Some(date);
                },
                Ok(date) => collection_date = Some(date),
                Err(e) => {
                    diags.error(
                        ErrorCode::InvalidCollectionDate,
                        ctx.clone(),
                        format!("/collection_date dropped: {}", e),
                    );
                    qualifiers.retain(|q| q.kind != QualifierKind::CollectionDate);
                },
            }
        }

        let skip = feature.has(QualifierKind::Transposon) || feature.has(QualifierKind::InsertionSeq);

        Ok(SourceFeatureRecord {
            index,
            order: feature.order,
            location: feature.location.clone(),
            organism,
            genome,
            organelle,
            modifiers,
            key,
            mol_type,
            focus,
            transgenic,
            environmental_sample,
            taxon_id,
            pcr_primers,
            collection_date,
            spans: Vec::new(),
            full: false,
            skip,
            qualifiers,
            descriptor: None,
        })
    }

    fn mol_type(
        &self,
        feature: &ParsedFeature,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Option<MolType>> {
        let values = feature.values_of(QualifierKind::MolType);
        match values.as_slice() {
            [] => Ok(None),
            [one] => {
                one.parse::<MolType>().map(Some).map_err(|e| {
                    diags.reject(
                        ErrorCode::InvalidMolType,
                        ctx.clone(),
                        format!("{} on source feature at {}", e, feature.location),
                    )
                })
            },
            _ => {
                Err(diags.reject(
                    ErrorCode::DuplicateMolType,
                    ctx.clone(),
                    format!("Source feature at {} has more than one /mol_type", feature.location),
                ))
            },
        }
    }

    fn taxon_id(
        &self,
        feature: &ParsedFeature,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Option<TaxonId>> {
        let mut ids = Vec::new();
        for xref in feature.values_of(QualifierKind::DbXref) {
            let Some(id) = xref.strip_prefix("taxon:")
            else {
                continue;
            };
            match id.trim().parse::<TaxonId>() {
                Ok(id) => ids.push(id),
                Err(_) => {
                    diags.error(
                        ErrorCode::InvalidTaxonXref,
                        ctx.clone(),
                        format!("Non-numeric taxon id in /db_xref=\"{}\"", xref),
                    )
                },
            }
        }
        let distinct = ids.into_iter().unique().collect_vec();
        if distinct.len() > 1 {
            return Err(diags.reject(
                ErrorCode::ConflictingTaxonIds,
                ctx.clone(),
                format!(
                    "Source feature at {} has taxon ids {}",
                    feature.location,
                    distinct.iter().join(", ")
                ),
            ));
        }
        Ok(distinct.first().copied())
    }

    fn check_flags(
        &self,
        feature: &ParsedFeature,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let has = |k| feature.has(k);
        if has(QualifierKind::Focus) && has(QualifierKind::Transgenic) {
            return Err(diags.reject(
                ErrorCode::FocusAndTransgenic,
                ctx.clone(),
                format!("Source feature at {} has both /focus and /transgenic", feature.location),
            ));
        }
        if has(QualifierKind::Germline) && has(QualifierKind::Rearranged) {
            return Err(diags.reject(
                ErrorCode::GermlineAndRearranged,
                ctx.clone(),
                format!("Source feature at {} has both /germline and /rearranged", feature.location),
            ));
        }
        if has(QualifierKind::Metagenomic) && !has(QualifierKind::EnvironmentalSample) {
            return Err(diags.reject(
                ErrorCode::MetagenomicWithoutEnvSample,
                ctx.clone(),
                format!(
                    "Source feature at {} has /metagenomic without /environmental_sample",
                    feature.location
                ),
            ));
        }
        if has(QualifierKind::EnvironmentalSample) && !has(QualifierKind::IsolationSource) {
            diags.warn(
                ErrorCode::EnvSampleWithoutSource,
                ctx.clone(),
                "/environmental_sample without /isolation_source",
            );
        }
        Ok(())
    }

    /// Checks that need every source feature: one mol_type per record and
    /// one taxon id per organism name.
    fn check_across(
        &self,
        records: &[SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let with_mol = records
            .iter()
            .filter(|r| r.mol_type.is_some())
            .collect_vec();
        if let Some(first) = with_mol.first() {
            if let Some(other) = with_mol
                .iter()
                .find(|r| r.mol_type != first.mol_type)
            {
                let ctx = diags.context("source", &other.location);
                return Err(diags.reject(
                    ErrorCode::MolTypesDiffer,
                    ctx,
                    format!(
                        "Source features at {} and {} have different /mol_type values",
                        first.location, other.location
                    ),
                ));
            }
        }

        let mut taxa: HashMap<String, (TaxonId, &str)> = HashMap::new();
        for record in records {
            let Some(id) = record.taxon_id
            else {
                continue;
            };
            let name = record.organism.to_ascii_lowercase();
            match taxa.get(&name) {
                Some((seen, location)) if *seen != id => {
                    let ctx = diags.context("source", &record.location);
                    return Err(diags.reject(
                        ErrorCode::ConflictingTaxonIds,
                        ctx,
                        format!(
                            "\"{}\" has taxon id {} at {} but {} at {}",
                            record.organism, seen, location, id, record.location
                        ),
                    ));
                },
                Some(_) => {},
                None => {
                    taxa.insert(name, (id, record.location.as_str()));
                },
            }
        }
        Ok(())
    }
}

/// Splits an organism value at its first genome keyword, returning the
/// text before it and the keyword's genome code.
pub fn split_genome_keyword(organism: &str) -> (String, Option<GenomeCode>) {
    let hit = GenomeCode::ALL
        .iter()
        .filter_map(|code| find_word_ci(organism, code.keyword()).map(|pos| (pos, *code)))
        .min_by_key(|(pos, _)| *pos);
    match hit {
        Some((pos, code)) => (organism[..pos].trim().to_string(), Some(code)),
        None => (organism.to_string(), None),
    }
}
