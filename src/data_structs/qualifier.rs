use std::fmt::Display;

use serde::Serialize;

use crate::utils::escape_quotes;

/// Closed set of qualifier names the pipeline reasons about. Everything
/// else is carried through as [`QualifierKind::Other`] and only checked
/// against the grammar.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize)]
pub enum QualifierKind {
    // Source-level
    Organism,
    Organelle,
    MolType,
    DbXref,
    Focus,
    Transgenic,
    EnvironmentalSample,
    Metagenomic,
    Germline,
    Rearranged,
    Macronuclear,
    Proviral,
    Plasmid,
    IsolationSource,
    PcrPrimers,
    CollectionDate,
    Transposon,
    InsertionSeq,

    // Modifiers
    Cultivar,
    Isolate,
    Serotype,
    Serovar,
    SpecimenVoucher,
    Strain,
    SubSpecies,
    SubStrain,
    Variety,
    Ecotype,

    // Gaps
    EstimatedLength,
    GapType,
    LinkageEvidence,

    // Feature-level
    Note,
    Translation,
    Replace,
    RptUnit,
    RptUnitSeq,
    Pseudo,
    Pseudogene,
    Evidence,
    Experiment,
    Inference,
    Product,
    Anticodon,
    RegulatoryClass,
    Operon,
    LocusTag,
    OldLocusTag,
    Gene,
    Partial,
    Exception,
    RibosomalSlippage,
    TransSplicing,
    CircularRna,

    Other,
}

impl QualifierKind {
    pub fn from_name(name: &str) -> Self {
        use QualifierKind::*;
        match name {
            "organism" => Organism,
            "organelle" => Organelle,
            "mol_type" => MolType,
            "db_xref" => DbXref,
            "focus" => Focus,
            "transgenic" => Transgenic,
            "environmental_sample" => EnvironmentalSample,
            "metagenomic" => Metagenomic,
            "germline" => Germline,
            "rearranged" => Rearranged,
            "macronuclear" => Macronuclear,
            "proviral" => Proviral,
            "plasmid" => Plasmid,
            "isolation_source" => IsolationSource,
            "PCR_primers" => PcrPrimers,
            "collection_date" => CollectionDate,
            "transposon" => Transposon,
            "insertion_seq" => InsertionSeq,
            "cultivar" => Cultivar,
            "isolate" => Isolate,
            "serotype" => Serotype,
            "serovar" => Serovar,
            "specimen_voucher" => SpecimenVoucher,
            "strain" => Strain,
            "sub_species" => SubSpecies,
            "sub_strain" => SubStrain,
            "variety" => Variety,
            "ecotype" => Ecotype,
            "estimated_length" => EstimatedLength,
            "gap_type" => GapType,
            "linkage_evidence" => LinkageEvidence,
            "note" => Note,
            "translation" => Translation,
            "replace" => Replace,
            "rpt_unit" => RptUnit,
            "rpt_unit_seq" => RptUnitSeq,
            "pseudo" => Pseudo,
            "pseudogene" => Pseudogene,
            "evidence" => Evidence,
            "experiment" => Experiment,
            "inference" => Inference,
            "product" => Product,
            "anticodon" => Anticodon,
            "regulatory_class" => RegulatoryClass,
            "operon" => Operon,
            "locus_tag" => LocusTag,
            "old_locus_tag" => OldLocusTag,
            "gene" => Gene,
            "partial" => Partial,
            "exception" => Exception,
            "ribosomal_slippage" => RibosomalSlippage,
            "trans_splicing" => TransSplicing,
            "circular_RNA" => CircularRna,
            _ => Other,
        }
    }

    /// Qualifiers that never take a value.
    pub fn is_valueless(&self) -> bool {
        use QualifierKind::*;
        matches!(
            self,
            EnvironmentalSample
                | Focus
                | Germline
                | Macronuclear
                | Metagenomic
                | Partial
                | Proviral
                | Pseudo
                | Rearranged
                | RibosomalSlippage
                | Transgenic
                | TransSplicing
                | CircularRna
        )
    }
}

/// One `/name` or `/name=value` attribute of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Qualifier {
    pub kind:   QualifierKind,
    pub name:   String,
    pub value:  Option<String>,
    pub quoted: bool,
}

impl Qualifier {
    pub fn new<S: Into<String>>(
        name: S,
        value: Option<String>,
        quoted: bool,
    ) -> Self {
        let name = name.into();
        Self {
            kind: QualifierKind::from_name(&name),
            name,
            value,
            quoted,
        }
    }

    /// A quoted `/name="value"` qualifier.
    pub fn quoted<S: Into<String>, V: Into<String>>(
        name: S,
        value: V,
    ) -> Self {
        Self::new(name, Some(value.into()), true)
    }

    /// An unquoted `/name=value` qualifier.
    pub fn bare<S: Into<String>, V: Into<String>>(
        name: S,
        value: V,
    ) -> Self {
        Self::new(name, Some(value.into()), false)
    }

    /// A valueless `/name` qualifier.
    pub fn flag<S: Into<String>>(name: S) -> Self {
        Self::new(name, None, false)
    }

    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Same name and same value; the quoting style does not matter.
    pub fn same_as(
        &self,
        other: &Self,
    ) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Display for Qualifier {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (&self.value, self.quoted) {
            (None, _) => write!(f, "/{}", self.name),
            (Some(v), true) => write!(f, "/{}=\"{}\"", self.name, escape_quotes(v)),
            (Some(v), false) => write!(f, "/{}={}", self.name, v),
        }
    }
}

/// Lookup helpers over a feature's ordered qualifier list.
pub trait QualifierList {
    fn qualifiers(&self) -> &[Qualifier];

    fn first_of(
        &self,
        kind: QualifierKind,
    ) -> Option<&Qualifier> {
        self.qualifiers().iter().find(|q| q.kind == kind)
    }

    fn value_of(
        &self,
        kind: QualifierKind,
    ) -> Option<&str> {
        self.first_of(kind).and_then(|q| q.value.as_deref())
    }

    fn values_of(
        &self,
        kind: QualifierKind,
    ) -> Vec<&str> {
        self.qualifiers()
            .iter()
            .filter(|q| q.kind == kind)
            .filter_map(|q| q.value.as_deref())
            .collect()
    }

    fn count_of(
        &self,
        kind: QualifierKind,
    ) -> usize {
        self.qualifiers()
            .iter()
            .filter(|q| q.kind == kind)
            .count()
    }

    fn has(
        &self,
        kind: QualifierKind,
    ) -> bool {
        self.first_of(kind).is_some()
    }
}

impl QualifierList for Vec<Qualifier> {
    fn qualifiers(&self) -> &[Qualifier] {
        self
    }
}

impl QualifierList for [Qualifier] {
    fn qualifiers(&self) -> &[Qualifier] {
        self
    }
}
