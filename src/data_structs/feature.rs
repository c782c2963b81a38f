use std::fmt::Display;

use anyhow::anyhow;
use itertools::Itertools;
use serde::Serialize;

use crate::data_structs::coords::{
    SeqRange,
    Span,
};
use crate::data_structs::qualifier::{
    Qualifier,
    QualifierKind,
    QualifierList,
};

/// Column at which the location starts in a flat-file feature line.
const LOCATION_COLUMN: usize = 21;

/// One unparsed feature block as handed over by the block slicer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawFeatureBlock {
    /// Position of the block in the record; output is re-sorted by it.
    pub order:      usize,
    pub key:        String,
    pub location:   String,
    /// Raw qualifier text, one source line per line.
    pub qualifiers: String,
}

impl RawFeatureBlock {
    pub fn new<K: Into<String>, L: Into<String>, Q: Into<String>>(
        order: usize,
        key: K,
        location: L,
        qualifiers: Q,
    ) -> Self {
        Self {
            order,
            key: key.into(),
            location: location.into(),
            qualifiers: qualifiers.into(),
        }
    }

    /// Splits the text of one block. The first line carries the key and the
    /// start of the location; the location continues on following lines up
    /// to the first line beginning with `/`.
    pub fn parse(
        order: usize,
        text: &str,
    ) -> anyhow::Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .skip_while(|l| l.is_empty());
        let first = lines
            .next()
            .ok_or_else(|| anyhow!("Empty feature block at position {}", order))?;

        let (key, location_start) = match first.split_once(char::is_whitespace) {
            Some((key, rest)) => (key, rest.trim()),
            None => (first, ""),
        };
        if key.starts_with('/') {
            anyhow::bail!("Feature block at position {} has no key", order);
        }

        let mut location = location_start.to_string();
        let mut qualifier_lines = Vec::new();
        let mut in_qualifiers = false;
        for line in lines {
            if !in_qualifiers && !line.starts_with('/') {
                location.push_str(line);
                continue;
            }
            in_qualifiers = true;
            qualifier_lines.push(line);
        }

        Ok(Self {
            order,
            key: key.to_string(),
            location: location.split_whitespace().join(""),
            qualifiers: qualifier_lines.join("\n"),
        })
    }

    /// Renders the block in flat-file feature-table layout.
    pub fn to_text(&self) -> String {
        let indent = " ".repeat(LOCATION_COLUMN);
        let mut out = format!("     {:<16}{}\n", self.key, self.location);
        for line in self.qualifiers.lines() {
            out.push_str(&indent);
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl From<&ParsedFeature> for RawFeatureBlock {
    fn from(feature: &ParsedFeature) -> Self {
        Self {
            order:      feature.order,
            key:        feature.key.clone(),
            location:   feature.location.clone(),
            qualifiers: feature
                .qualifiers
                .iter()
                .map(|q| q.to_string())
                .join("\n"),
        }
    }
}

/// Per-feature flags derived during assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureFlags {
    pub partial:   bool,
    pub pseudo:    bool,
    pub exception: bool,
}

/// A feature after tokenizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFeature {
    pub order:      usize,
    pub key:        String,
    pub location:   String,
    pub qualifiers: Vec<Qualifier>,
    pub flags:      FeatureFlags,
    /// Filled in by location resolution.
    pub ranges:     Vec<SeqRange>,
}

impl QualifierList for ParsedFeature {
    fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }
}

impl ParsedFeature {
    pub fn new<K: Into<String>, L: Into<String>>(
        order: usize,
        key: K,
        location: L,
        qualifiers: Vec<Qualifier>,
    ) -> Self {
        Self {
            order,
            key: key.into(),
            location: location.into(),
            qualifiers,
            flags: FeatureFlags::default(),
            ranges: Vec::new(),
        }
    }

    pub fn is_source(&self) -> bool {
        self.key == "source"
    }

    pub fn is_gap(&self) -> bool {
        self.key == "gap" || self.key == "assembly_gap"
    }

    /// Removes every qualifier of `kind`, returning how many were removed.
    pub fn remove_all(
        &mut self,
        kind: QualifierKind,
    ) -> usize {
        let before = self.qualifiers.len();
        self.qualifiers.retain(|q| q.kind != kind);
        before - self.qualifiers.len()
    }

    /// Replaces the value of the first qualifier of `kind`, or appends a new
    /// quoted qualifier when there is none.
    pub fn set_value<S: Into<String>>(
        &mut self,
        kind: QualifierKind,
        name: &str,
        value: S,
    ) {
        let value = value.into();
        match self.qualifiers.iter_mut().find(|q| q.kind == kind) {
            Some(q) => q.value = Some(value),
            None => self.qualifiers.push(Qualifier::quoted(name, value)),
        }
    }

    /// Smallest span covering all resolved ranges.
    pub fn extent(&self) -> Option<Span> {
        self.ranges
            .iter()
            .map(|r| r.span)
            .reduce(|a, b| a.hull(&b))
    }

    /// Multiset of `(name, value)` pairs, order-insensitive, used to spot
    /// duplicate features.
    pub fn qualifier_signature(&self) -> Vec<(String, Option<String>)> {
        self.qualifiers
            .iter()
            .map(|q| (q.name.clone(), q.value.clone()))
            .sorted()
            .collect()
    }
}

impl Display for ParsedFeature {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", RawFeatureBlock::from(self).to_text())
    }
}
