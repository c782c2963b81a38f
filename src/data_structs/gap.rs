use std::fmt::Display;

use serde::Serialize;

use crate::data_structs::coords::Span;
use crate::data_structs::enums::{
    GapType,
    LinkageEvidence,
};

/// `/estimated_length` of a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GapLength {
    Known(u32),
    Unknown,
}

impl Display for GapLength {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            GapLength::Known(n) => write!(f, "{}", n),
            GapLength::Unknown => write!(f, "unknown"),
        }
    }
}

/// One validated `gap` or `assembly_gap` feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapFeatureRecord {
    pub from:             u32,
    pub to:               u32,
    pub estimated_length: GapLength,
    pub gap_type:         Option<GapType>,
    pub linkage_evidence: Vec<LinkageEvidence>,
    /// `assembly_gap` (AGP 2.0) rather than legacy `gap`.
    pub is_assembly_gap:  bool,
    pub location:         String,
}

impl GapFeatureRecord {
    pub fn span(&self) -> Span {
        Span::new(self.from, self.to)
    }

    pub fn key(&self) -> &'static str {
        if self.is_assembly_gap {
            "assembly_gap"
        }
        else {
            "gap"
        }
    }
}
