//! Choosing the one source feature that describes the record's organism.
//!
//! Candidates are put into a fixed order first (by first span, then key,
//! then location) so that the outcome does not depend on the order the
//! features appeared in. The rules are then tried in turn and the first
//! one that applies decides:
//!
//! 1. a lone source feature is used as is;
//! 2. if every feature names the same organism, the one non-skip feature is
//!    used, or else a merged record is built from all of them;
//! 3. a `/transgenic` feature is used (it must be unique and full length);
//! 4. a `/focus` feature is used, merged with the features of its organism;
//! 5. the first full-length feature is used.
//!
//! If nothing applies the record is rejected.

use hashbrown::HashSet;
use itertools::Itertools;
use log::debug;

use crate::data_structs::typedef::PosType;
use crate::data_structs::{
    Qualifier,
    QualifierKind,
    QualifierList,
    SourceFeatureRecord,
    Span,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};
use crate::source::attrs::parse_pcr_primers;
use crate::source::coverage::is_synthetic;
use crate::utils::collapse_blanks;

/// The chosen descriptor source and the features sharing its organism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consolidation {
    pub chosen:  SourceFeatureRecord,
    /// `index` of every source feature with the chosen organism name.
    pub members: Vec<usize>,
}

pub struct SourceConsolidator {
    sequence_length: PosType,
}

impl SourceConsolidator {
    pub fn new(sequence_length: PosType) -> Self {
        Self { sequence_length }
    }

    pub fn consolidate(
        &self,
        records: &[SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Consolidation> {
        if records.is_empty() {
            let ctx = diags.record_context();
            return Err(diags.reject(
                ErrorCode::NoSourceFeature,
                ctx,
                "Record has no source feature",
            ));
        }

        let ordered = records
            .iter()
            .sorted_by(|a, b| {
                let span_a = a.first_span().map(|s| (s.start(), s.end()));
                let span_b = b.first_span().map(|s| (s.start(), s.end()));
                span_a
                    .cmp(&span_b)
                    .then_with(|| a.key.cmp(&b.key))
                    .then_with(|| a.location.cmp(&b.location))
            })
            .collect_vec();

        self.check_focus_organisms(&ordered, diags)?;
        let result = self.select(&ordered, diags)?;
        self.check_focus_needed(&ordered, diags)?;

        debug!(
            "{}: descriptor source is \"{}\" at {} ({} members)",
            diags.accession(),
            result.chosen.key,
            result.chosen.location,
            result.members.len()
        );
        Ok(result)
    }

    fn select(
        &self,
        ordered: &[&SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Consolidation> {
        // Rule 1
        if let [only] = ordered {
            if !only.full {
                let ctx = diags.context("source", &only.location);
                diags.warn(
                    ErrorCode::SingleSourceNotFull,
                    ctx,
                    format!(
                        "Single source feature at {} does not span the whole sequence",
                        only.location
                    ),
                );
            }
            return Ok(Consolidation {
                chosen:  (*only).clone(),
                members: vec![only.index],
            });
        }

        // Rule 2
        let first = ordered[0];
        if ordered.iter().all(|r| r.same_organism(first)) {
            let not_skipped = ordered
                .iter()
                .filter(|r| !r.skip)
                .copied()
                .collect_vec();
            let members = ordered.iter().map(|r| r.index).collect_vec();
            if let [single] = not_skipped.as_slice() {
                return Ok(Consolidation {
                    chosen: (*single).clone(),
                    members,
                });
            }
            let chosen = not_skipped.first().copied().unwrap_or(first);
            return Ok(Consolidation {
                chosen: self.merge(chosen, ordered),
                members,
            });
        }

        // Rule 3
        let transgenic = ordered
            .iter()
            .filter(|r| r.transgenic)
            .copied()
            .collect_vec();
        match transgenic.as_slice() {
            [] => {},
            [one] => {
                if !one.full {
                    let ctx = diags.context("source", &one.location);
                    return Err(diags.reject(
                        ErrorCode::TransgenicNotFull,
                        ctx,
                        format!(
                            "Transgenic source feature at {} does not span the whole sequence",
                            one.location
                        ),
                    ));
                }
                return Ok(Consolidation {
                    chosen:  (*one).clone(),
                    members: same_organism(ordered, one),
                });
            },
            [one, two, ..] => {
                let ctx = diags.context("source", &two.location);
                return Err(diags.reject(
                    ErrorCode::MultipleTransgenic,
                    ctx,
                    format!(
                        "More than one /transgenic source feature ({} and {})",
                        one.location, two.location
                    ),
                ));
            },
        }

        // Rule 4
        let focused = ordered
            .iter()
            .filter(|r| r.focus)
            .copied()
            .collect_vec();
        if let Some(chosen) = focused
            .iter()
            .find(|r| !r.skip)
            .or_else(|| focused.first())
            .copied()
        {
            let group = ordered
                .iter()
                .filter(|r| r.same_organism(chosen))
                .copied()
                .collect_vec();
            return Ok(Consolidation {
                chosen:  self.merge(chosen, &group),
                members: group.iter().map(|r| r.index).collect(),
            });
        }

        // Rule 5
        if let Some(full) = ordered.iter().find(|r| r.full) {
            return Ok(Consolidation {
                chosen:  (*full).clone(),
                members: same_organism(ordered, full),
            });
        }

        // Rule 6
        let ctx = diags.context("source", &first.location);
        Err(diags.reject(
            ErrorCode::NoDescriptorSource,
            ctx,
            format!(
                "Cannot select a descriptor source among {} source features ({})",
                ordered.len(),
                ordered.iter().map(|r| r.location.as_str()).join(", ")
            ),
        ))
    }

    /// Builds a new record for `chosen` that keeps only the qualifiers every
    /// useable member of `group` carries and whose location spans the whole
    /// group. Skip-flagged members are not useable unless all of them are.
    pub fn merge(
        &self,
        chosen: &SourceFeatureRecord,
        group: &[&SourceFeatureRecord],
    ) -> SourceFeatureRecord {
        let useable = {
            let not_skipped = group
                .iter()
                .filter(|r| !r.skip)
                .copied()
                .collect_vec();
            if not_skipped.is_empty() {
                group.to_vec()
            }
            else {
                not_skipped
            }
        };

        let mut kept: Vec<Qualifier> = Vec::new();
        for q in &chosen.qualifiers {
            let everywhere = useable
                .iter()
                .all(|r| r.qualifiers.iter().any(|o| o.same_as(q)));
            if everywhere && !kept.iter().any(|k| k.same_as(q)) {
                kept.push(q.clone());
            }
        }

        let hull = group_extent(group);

        let mut merged = chosen.clone();
        merged.qualifiers = kept;
        restrict_attributes(&mut merged, &useable);
        merged.focus = group.iter().any(|r| r.focus);
        merged.taxon_id = chosen
            .taxon_id
            .or_else(|| group.iter().find_map(|r| r.taxon_id));
        if let Some(hull) = hull {
            merged.location = format!("{}..{}", hull.start(), hull.end());
            merged.spans = vec![hull];
            merged.full = hull.is_full(self.sequence_length);
        }
        merged
    }

    /// `/focus` may only be set on features of one organism.
    fn check_focus_organisms(
        &self,
        ordered: &[&SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let focused = ordered
            .iter()
            .filter(|r| r.focus)
            .collect_vec();
        if let Some(first) = focused.first() {
            if let Some(other) = focused.iter().find(|r| !r.same_organism(first)) {
                let ctx = diags.context("source", &other.location);
                return Err(diags.reject(
                    ErrorCode::MultipleFocusOrganisms,
                    ctx,
                    format!(
                        "/focus set for \"{}\" at {} and \"{}\" at {}",
                        first.organism, first.location, other.organism, other.location
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Records describing several organisms must say which one is the
    /// subject, unless the extra organisms are explained by a single
    /// transgenic or synthetic full-length feature.
    fn check_focus_needed(
        &self,
        ordered: &[&SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let names: HashSet<String> = ordered
            .iter()
            .map(|r| r.organism.to_ascii_lowercase())
            .collect();
        if names.len() <= 1 || ordered.iter().any(|r| r.focus) {
            return Ok(());
        }
        let full = ordered.iter().filter(|r| r.full).count();
        let transgenic = ordered.iter().filter(|r| r.transgenic).count();
        let synthetic = ordered
            .iter()
            .filter(|r| is_synthetic(&r.organism))
            .count();
        if full > 1 && (transgenic == 1 || synthetic == 1) {
            return Ok(());
        }
        let ctx = diags.context("source", &ordered[0].location);
        Err(diags.reject(
            ErrorCode::FocusMissing,
            ctx,
            format!(
                "Source features describe {} organisms ({}) but none carries /focus",
                names.len(),
                ordered
                    .iter()
                    .map(|r| format!("\"{}\" at {}", r.organism, r.location))
                    .join(", ")
            ),
        ))
    }
}

fn same_organism(
    ordered: &[&SourceFeatureRecord],
    chosen: &SourceFeatureRecord,
) -> Vec<usize> {
    ordered
        .iter()
        .filter(|r| r.same_organism(chosen))
        .map(|r| r.index)
        .collect()
}

/// Brings the typed attributes of a merged record in line with its
/// intersected qualifiers, then rebuilds the disambiguation key.
fn restrict_attributes(
    merged: &mut SourceFeatureRecord,
    useable: &[&SourceFeatureRecord],
) {
    let qualifiers = &merged.qualifiers;
    merged.modifiers.retain(|(kind, value)| {
        qualifiers
            .iter()
            .any(|q| q.kind == kind.qualifier_kind() && collapse_blanks(q.value_str()) == *value)
    });
    merged.key = SourceFeatureRecord::make_key(&merged.organism, &merged.modifiers);

    if !qualifiers.has(QualifierKind::Organelle) {
        merged.organelle = None;
    }
    if !useable.iter().all(|r| r.genome == merged.genome) {
        merged.genome = None;
    }
    if !qualifiers.has(QualifierKind::CollectionDate) {
        merged.collection_date = None;
    }
    merged.pcr_primers = qualifiers
        .values_of(QualifierKind::PcrPrimers)
        .into_iter()
        .filter_map(|v| parse_pcr_primers(v).ok())
        .collect();
    merged.transgenic = qualifiers.has(QualifierKind::Transgenic);
    merged.environmental_sample = qualifiers.has(QualifierKind::EnvironmentalSample);
}

/// Smallest span covering every member's spans.
pub fn group_extent(group: &[&SourceFeatureRecord]) -> Option<Span> {
    group
        .iter()
        .filter_map(|r| r.extent())
        .reduce(|a, b| a.hull(&b))
}
