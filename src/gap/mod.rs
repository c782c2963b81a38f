//! Validation of `gap` and `assembly_gap` features.
//!
//! Each gap must sit on one plain `from..to` span inside the sequence and
//! carry an `/estimated_length` that agrees with it. `assembly_gap` features
//! additionally carry a typed `/gap_type` and, for gaps inside a scaffold,
//! the `/linkage_evidence` that joins the flanking sequence. The accepted
//! gaps are returned sorted by start; across them no two may overlap or
//! touch.

use itertools::Itertools;
use log::debug;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::data_structs::enums::{
    GapType,
    HtgPhase,
    LinkageEvidence,
    SourceDb,
};
use crate::data_structs::typedef::PosType;
use crate::data_structs::{
    GapFeatureRecord,
    GapLength,
    ParsedFeature,
    QualifierKind,
    QualifierList,
    Span,
};
use crate::diagnostics::{
    DiagnosticContext,
    Diagnostics,
    ErrorCode,
};

#[cfg(test)]
mod tests;

/// Length an `unknown` gap is expected to have in HTG records.
pub const HTG_UNKNOWN_GAP_LENGTH: u32 = 100;

static GAP_LOCATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(?:\.\.(\d+))?$").unwrap());

pub struct GapFeatureValidator {
    source_db:       SourceDb,
    htg_phase:       HtgPhase,
    sequence_length: PosType,
}

impl GapFeatureValidator {
    pub fn new(
        source_db: SourceDb,
        htg_phase: HtgPhase,
        sequence_length: PosType,
    ) -> Self {
        Self {
            source_db,
            htg_phase,
            sequence_length,
        }
    }

    fn length_mismatch_tolerated(&self) -> bool {
        matches!(self.source_db, SourceDb::Embl | SourceDb::Ddbj)
    }

    fn adjacency_tolerated(&self) -> bool {
        self.source_db == SourceDb::Ddbj
    }

    /// Validates every gap feature among `features` and returns them sorted
    /// by start. Any reject discards the whole list.
    pub fn validate(
        &self,
        features: &[ParsedFeature],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Vec<GapFeatureRecord>> {
        let gaps = features
            .iter()
            .filter(|f| f.is_gap())
            .collect_vec();
        if gaps.is_empty() {
            return Ok(Vec::new());
        }

        self.check_mixed(&gaps, diags)?;

        let mut records = Vec::with_capacity(gaps.len());
        for feature in gaps {
            records.push(self.validate_one(feature, diags)?);
        }
        records.sort_by_key(|g| (g.from, g.to));
        self.check_neighbours(&records, diags)?;

        debug!("{}: {} gap features accepted", diags.accession(), records.len());
        Ok(records)
    }

    /// Legacy `gap` and `assembly_gap` must not be mixed in one record.
    fn check_mixed(
        &self,
        gaps: &[&ParsedFeature],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let legacy = gaps.iter().find(|f| f.key == "gap");
        let typed = gaps.iter().find(|f| f.key == "assembly_gap");
        if let (Some(legacy), Some(typed)) = (legacy, typed) {
            let ctx = diags.feature_context(typed);
            return Err(diags.reject(
                ErrorCode::MixedGapFeatures,
                ctx,
                format!(
                    "Record mixes gap ({}) and assembly_gap ({}) features",
                    legacy.location, typed.location
                ),
            ));
        }
        Ok(())
    }

    fn validate_one(
        &self,
        feature: &ParsedFeature,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<GapFeatureRecord> {
        let ctx = diags.feature_context(feature);
        let span = self.span(feature, &ctx, diags)?;
        let estimated_length = self.estimated_length(feature, span, &ctx, diags)?;

        let is_assembly_gap = feature.key == "assembly_gap";
        let (gap_type, linkage_evidence) = if is_assembly_gap {
            self.typing(feature, &ctx, diags)?
        }
        else {
            (None, Vec::new())
        };

        Ok(GapFeatureRecord {
            from: span.start(),
            to: span.end(),
            estimated_length,
            gap_type,
            linkage_evidence,
            is_assembly_gap,
            location: feature.location.clone(),
        })
    }

    fn span(
        &self,
        feature: &ParsedFeature,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<Span> {
        let compact: String = feature
            .location
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let parsed = GAP_LOCATION_RE.captures(&compact).and_then(|caps| {
            let from: PosType = caps[1].parse().ok()?;
            let to: PosType = match caps.get(2) {
                Some(m) => m.as_str().parse().ok()?,
                None => from,
            };
            (from >= 1).then_some(())?;
            Span::try_new(from, to)
        });
        let Some(span) = parsed
        else {
            return Err(diags.reject(
                ErrorCode::GapLocation,
                ctx.clone(),
                format!(
                    "{} location {} is not a single from..to span",
                    feature.key, feature.location
                ),
            ));
        };
        if span.end() > self.sequence_length {
            return Err(diags.reject(
                ErrorCode::GapOutOfRange,
                ctx.clone(),
                format!(
                    "{} at {} runs past the sequence end ({})",
                    feature.key, feature.location, self.sequence_length
                ),
            ));
        }
        Ok(span)
    }

    fn estimated_length(
        &self,
        feature: &ParsedFeature,
        span: Span,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<GapLength> {
        let Some(value) = feature.value_of(QualifierKind::EstimatedLength)
        else {
            return Err(diags.reject(
                ErrorCode::MissingEstimatedLength,
                ctx.clone(),
                format!("{} at {} has no /estimated_length", feature.key, feature.location),
            ));
        };

        let value = value.trim();
        if value == "unknown" {
            if self.htg_phase.is_htg() && span.length() != HTG_UNKNOWN_GAP_LENGTH {
                diags.warn(
                    ErrorCode::UnknownGapLength,
                    ctx.clone(),
                    format!(
                        "Gap of unknown length at {} should span {} bases, spans {}",
                        feature.location,
                        HTG_UNKNOWN_GAP_LENGTH,
                        span.length()
                    ),
                );
            }
            return Ok(GapLength::Unknown);
        }

        let length = match value.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(diags.reject(
                    ErrorCode::InvalidEstimatedLength,
                    ctx.clone(),
                    format!(
                        "/estimated_length=\"{}\" at {} is neither a positive number nor unknown",
                        value, feature.location
                    ),
                ))
            },
        };

        if length != span.length() {
            let message = format!(
                "/estimated_length {} at {} does not match the span length {}",
                length,
                feature.location,
                span.length()
            );
            if self.length_mismatch_tolerated() {
                diags.warn(ErrorCode::GapLengthMismatch, ctx.clone(), message);
            }
            else {
                return Err(diags.reject(ErrorCode::GapLengthMismatch, ctx.clone(), message));
            }
        }
        Ok(GapLength::Known(length))
    }

    fn typing(
        &self,
        feature: &ParsedFeature,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> anyhow::Result<(Option<GapType>, Vec<LinkageEvidence>)> {
        let Some(raw_type) = feature.value_of(QualifierKind::GapType)
        else {
            return Err(diags.reject(
                ErrorCode::MissingGapType,
                ctx.clone(),
                format!("assembly_gap at {} has no /gap_type", feature.location),
            ));
        };
        let gap_type = raw_type.parse::<GapType>().map_err(|e| {
            diags.reject(
                ErrorCode::InvalidGapType,
                ctx.clone(),
                format!("{} at {}", e, feature.location),
            )
        })?;

        let mut evidence = Vec::new();
        for value in feature.values_of(QualifierKind::LinkageEvidence) {
            let parsed = value.parse::<LinkageEvidence>().map_err(|e| {
                diags.reject(
                    ErrorCode::InvalidLinkageEvidence,
                    ctx.clone(),
                    format!("{} at {}", e, feature.location),
                )
            })?;
            evidence.push(parsed);
        }

        match (gap_type.requires_linkage(), evidence.is_empty()) {
            (true, true) => {
                return Err(diags.reject(
                    ErrorCode::MissingLinkageEvidence,
                    ctx.clone(),
                    format!(
                        "assembly_gap at {} of type \"{}\" needs /linkage_evidence",
                        feature.location, gap_type
                    ),
                ))
            },
            (false, false) => {
                return Err(diags.reject(
                    ErrorCode::IllegalLinkageEvidence,
                    ctx.clone(),
                    format!(
                        "assembly_gap at {} of type \"{}\" may not carry /linkage_evidence",
                        feature.location, gap_type
                    ),
                ))
            },
            _ => {},
        }

        if self.htg_phase.is_htg() && !evidence.is_empty() {
            let unspecified = evidence.contains(&LinkageEvidence::Unspecified);
            if self.htg_phase.is_draft() && !unspecified {
                diags.warn(
                    ErrorCode::HtgLinkageEvidence,
                    ctx.clone(),
                    format!(
                        "Draft HTG record expects /linkage_evidence=\"unspecified\" at {}",
                        feature.location
                    ),
                );
            }
            else if !self.htg_phase.is_draft() && unspecified {
                diags.warn(
                    ErrorCode::HtgLinkageEvidence,
                    ctx.clone(),
                    format!(
                        "HTG phase 2/3 record should not use /linkage_evidence=\"unspecified\" at {}",
                        feature.location
                    ),
                );
            }
        }

        Ok((Some(gap_type), evidence))
    }

    /// Sorted gaps may neither overlap nor touch.
    fn check_neighbours(
        &self,
        sorted: &[GapFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let Some(first) = sorted.first()
        else {
            return Ok(());
        };
        let mut reach = first;
        for gap in &sorted[1..] {
            if gap.from <= reach.to {
                let ctx = diags.context(gap.key(), &gap.location);
                return Err(diags.reject(
                    ErrorCode::OverlappingGaps,
                    ctx,
                    format!("Gaps at {} and {} overlap", reach.location, gap.location),
                ));
            }
            if reach.span().is_adjacent(&gap.span()) {
                let ctx = diags.context(gap.key(), &gap.location);
                let message = format!("Gaps at {} and {} are contiguous", reach.location, gap.location);
                if self.adjacency_tolerated() {
                    diags.warn(ErrorCode::ContiguousGaps, ctx, message);
                }
                else {
                    return Err(diags.reject(ErrorCode::ContiguousGaps, ctx, message));
                }
            }
            if gap.to > reach.to {
                reach = gap;
            }
        }
        Ok(())
    }
}
