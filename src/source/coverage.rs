use hashbrown::HashSet;
use itertools::Itertools;
use log::debug;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::data_structs::typedef::PosType;
use crate::data_structs::{
    SourceFeatureRecord,
    Span,
    SpanIndex,
};
use crate::diagnostics::{
    Diagnostics,
    ErrorCode,
};

static NUMBER_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:(?:\.\.|\^)(\d+))?").unwrap());

/// Organism names exempt from overlap and excess-coverage checks.
const SYNTHETIC_ORGANISMS: [&str; 5] = [
    "synthetic construct",
    "artificial sequence",
    "other sequences",
    "unidentified",
    "eukaryotic synthetic construct",
];

pub fn is_synthetic(organism: &str) -> bool {
    let name = organism.trim().to_ascii_lowercase();
    SYNTHETIC_ORGANISMS.contains(&name.as_str()) || name.ends_with("vector")
}

/// Reads every `a..b`, `a^b` and lone `a` out of a location, ignoring
/// operators, partial markers and accessions' punctuation.
pub fn simple_spans(location: &str) -> Vec<Span> {
    let cleaned: String = location
        .chars()
        .filter(|c| !matches!(c, '<' | '>') && !c.is_whitespace())
        .collect();
    NUMBER_GROUP_RE
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            let a: PosType = caps[1].parse().ok()?;
            let b: PosType = match caps.get(2) {
                Some(m) => m.as_str().parse().ok()?,
                None => a,
            };
            Some(Span::new(a, b))
        })
        .collect()
}

/// Checks that the source features of a record cover the sequence exactly
/// once per organism.
pub struct CoverageValidator {
    sequence_length: PosType,
}

impl CoverageValidator {
    pub fn new(sequence_length: PosType) -> Self {
        Self { sequence_length }
    }

    fn is_special(
        &self,
        record: &SourceFeatureRecord,
    ) -> bool {
        record.full || record.skip || is_synthetic(&record.organism)
    }

    /// Fills in `spans` and `full` on every record, then runs the overlap,
    /// coverage and excess checks. A record without source features is left
    /// to the consolidator to reject.
    pub fn validate(
        &self,
        records: &mut [SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records.iter_mut() {
            let spans = simple_spans(&record.location);
            let ctx = diags.context("source", &record.location);
            if spans.is_empty() {
                return Err(diags.reject(
                    ErrorCode::UnparseableSourceLocation,
                    ctx,
                    format!("No positions in source location {}", record.location),
                ));
            }
            if let Some(past) = spans
                .iter()
                .find(|s| s.end() > self.sequence_length)
            {
                return Err(diags.reject(
                    ErrorCode::SourceOutOfRange,
                    ctx,
                    format!(
                        "Source location {} ends at {} past the sequence length {}",
                        record.location,
                        past.end(),
                        self.sequence_length
                    ),
                ));
            }
            record.full = spans
                .iter()
                .any(|s| s.is_full(self.sequence_length));
            record.spans = spans;
        }

        self.check_overlap(records, diags)?;
        self.check_coverage(records, diags)?;
        self.check_excess(records, diags)?;
        debug!("{}: source coverage is complete", diags.accession());
        Ok(())
    }

    /// Two non-special spans of differently named organisms must not share a
    /// base. The first such pair in start order is reported.
    fn check_overlap(
        &self,
        records: &[SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let index: SpanIndex<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| !self.is_special(r))
            .flat_map(|(i, r)| r.spans.iter().map(move |s| (*s, i)))
            .collect();

        for (span, owner) in index.spans() {
            let this = &records[*owner];
            let clash = index
                .find(&span)
                .into_iter()
                .find(|(_, other)| **other != *owner && !records[**other].same_organism(this));
            if let Some((other_span, other)) = clash {
                let that = &records[*other];
                let ctx = diags.context("source", &this.location);
                return Err(diags.reject(
                    ErrorCode::SourceOverlap,
                    ctx,
                    format!(
                        "Source features for \"{}\" at {} ({}) and \"{}\" at {} ({}) overlap",
                        this.organism, this.location, span, that.organism, that.location, other_span
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Sweeps all spans from base 1; the sweep must reach the last base.
    fn check_coverage(
        &self,
        records: &[SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let all = records
            .iter()
            .flat_map(|r| r.spans.iter().map(move |s| (*s, r)))
            .sorted_by_key(|(s, _)| *s)
            .collect_vec();

        let mut reached: PosType = 0;
        let mut last_location = None;
        for (span, record) in &all {
            if span.start() > reached + 1 {
                break;
            }
            if span.end() > reached {
                reached = span.end();
                last_location = Some(record.location.as_str());
            }
        }
        if reached >= self.sequence_length {
            return Ok(());
        }

        let location = last_location
            .or_else(|| all.first().map(|(_, r)| r.location.as_str()))
            .unwrap_or("")
            .to_string();
        let ctx = diags.context("source", &location);
        Err(diags.reject(
            ErrorCode::IncompleteCoverage,
            ctx,
            format!(
                "Source features cover 1..{} only, sequence length is {} (last covering feature {})",
                reached, self.sequence_length, location
            ),
        ))
    }

    /// At most one real organism may claim the whole sequence.
    fn check_excess(
        &self,
        records: &[SourceFeatureRecord],
        diags: &mut Diagnostics,
    ) -> anyhow::Result<()> {
        let claimants = records
            .iter()
            .filter(|r| r.full && !r.transgenic && !is_synthetic(&r.organism))
            .collect_vec();
        let names: HashSet<String> = claimants
            .iter()
            .map(|r| r.organism.to_ascii_lowercase())
            .collect();
        if names.len() <= 1 {
            return Ok(());
        }
        let ctx = diags.context("source", &claimants[0].location);
        Err(diags.reject(
            ErrorCode::ExcessCoverage,
            ctx,
            format!(
                "Organisms {} each span the whole sequence",
                claimants
                    .iter()
                    .map(|r| format!("\"{}\" ({})", r.organism, r.location))
                    .unique()
                    .join(", ")
            ),
        ))
    }
}
