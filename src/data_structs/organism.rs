use std::fmt::Display;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::data_structs::coords::Span;
use crate::data_structs::enums::{
    GenomeCode,
    MolType,
};
use crate::data_structs::qualifier::{
    Qualifier,
    QualifierKind,
    QualifierList,
};
use crate::data_structs::typedef::TaxonId;

/// Organism modifiers that take part in the disambiguation key, in key
/// order.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord, Serialize)]
pub enum ModifierKind {
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
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 10] = [
        ModifierKind::Cultivar,
        ModifierKind::Isolate,
        ModifierKind::Serotype,
        ModifierKind::Serovar,
        ModifierKind::SpecimenVoucher,
        ModifierKind::Strain,
        ModifierKind::SubSpecies,
        ModifierKind::SubStrain,
        ModifierKind::Variety,
        ModifierKind::Ecotype,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModifierKind::Cultivar => "cultivar",
            ModifierKind::Isolate => "isolate",
            ModifierKind::Serotype => "serotype",
            ModifierKind::Serovar => "serovar",
            ModifierKind::SpecimenVoucher => "specimen_voucher",
            ModifierKind::Strain => "strain",
            ModifierKind::SubSpecies => "sub_species",
            ModifierKind::SubStrain => "sub_strain",
            ModifierKind::Variety => "variety",
            ModifierKind::Ecotype => "ecotype",
        }
    }

    pub fn qualifier_kind(&self) -> QualifierKind {
        match self {
            ModifierKind::Cultivar => QualifierKind::Cultivar,
            ModifierKind::Isolate => QualifierKind::Isolate,
            ModifierKind::Serotype => QualifierKind::Serotype,
            ModifierKind::Serovar => QualifierKind::Serovar,
            ModifierKind::SpecimenVoucher => QualifierKind::SpecimenVoucher,
            ModifierKind::Strain => QualifierKind::Strain,
            ModifierKind::SubSpecies => QualifierKind::SubSpecies,
            ModifierKind::SubStrain => QualifierKind::SubStrain,
            ModifierKind::Variety => QualifierKind::Variety,
            ModifierKind::Ecotype => QualifierKind::Ecotype,
        }
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl Display for ModifierKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which modifiers are appended to the disambiguation key.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize)]
pub struct ModifierUseSet(u16);

impl Default for ModifierUseSet {
    fn default() -> Self {
        Self::all()
    }
}

impl ModifierUseSet {
    pub fn all() -> Self {
        Self(
            ModifierKind::ALL
                .iter()
                .fold(0, |acc, m| acc | m.bit()),
        )
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(
        self,
        kind: ModifierKind,
    ) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn without(
        self,
        kind: ModifierKind,
    ) -> Self {
        Self(self.0 & !kind.bit())
    }

    pub fn contains(
        &self,
        kind: ModifierKind,
    ) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Enabled modifiers in key order.
    pub fn iter(&self) -> impl Iterator<Item = ModifierKind> + '_ {
        ModifierKind::ALL
            .into_iter()
            .filter(move |m| self.contains(*m))
    }
}

/// One parsed `/PCR_primers` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PcrPrimerSet {
    pub fwd_name: Vec<String>,
    pub fwd_seq:  Vec<String>,
    pub rev_name: Vec<String>,
    pub rev_seq:  Vec<String>,
}

/// A `/collection_date` component with the precision it was given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PartialDate {
    pub year:  i32,
    pub month: Option<u32>,
    pub day:   Option<u32>,
}

impl PartialDate {
    /// First calendar day the value can denote.
    pub fn earliest(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }
}

impl Display for PartialDate {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (self.month, self.day) {
            (Some(m), Some(d)) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
            (Some(m), None) => write!(f, "{:04}-{:02}", self.year, m),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

/// A parsed `/collection_date`: one date or a `from/to` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CollectionDate {
    pub from: PartialDate,
    pub to:   Option<PartialDate>,
}

impl CollectionDate {
    /// Latest bound of the value, used for the "not in the future" check.
    pub fn last(&self) -> &PartialDate {
        self.to.as_ref().unwrap_or(&self.from)
    }
}

/// One `source` feature with its organism attributes pulled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFeatureRecord {
    /// Index among the record's source features.
    pub index:                usize,
    /// Position of the feature in the record.
    pub order:                usize,
    pub location:             String,
    pub organism:             String,
    pub genome:               Option<GenomeCode>,
    pub organelle:            Option<String>,
    pub modifiers:            Vec<(ModifierKind, String)>,
    /// Organism name followed by every enabled modifier.
    pub key:                  String,
    pub mol_type:             Option<MolType>,
    pub focus:                bool,
    pub transgenic:           bool,
    pub environmental_sample: bool,
    pub taxon_id:             Option<TaxonId>,
    pub pcr_primers:          Vec<PcrPrimerSet>,
    pub collection_date:      Option<CollectionDate>,
    /// Filled in by coverage validation.
    pub spans:                Vec<Span>,
    pub full:                 bool,
    /// Excluded from overlap checks (transposon/insertion_seq present).
    pub skip:                 bool,
    pub qualifiers:           Vec<Qualifier>,
    pub descriptor:           Option<OrganismDescriptor>,
}

impl QualifierList for SourceFeatureRecord {
    fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }
}

impl SourceFeatureRecord {
    /// Builds the disambiguation key from an organism name and modifiers.
    pub fn make_key(
        organism: &str,
        modifiers: &[(ModifierKind, String)],
    ) -> String {
        let mut key = organism.to_string();
        for (kind, value) in modifiers {
            key.push_str(&format!("  ({} {})", kind, value));
        }
        key
    }

    /// Case-insensitive organism-name equality; modifiers are ignored.
    pub fn same_organism(
        &self,
        other: &Self,
    ) -> bool {
        self.organism.eq_ignore_ascii_case(&other.organism)
    }

    /// First resolved span, used to order candidates.
    pub fn first_span(&self) -> Option<Span> {
        self.spans.first().copied()
    }

    pub fn extent(&self) -> Option<Span> {
        self.spans
            .iter()
            .copied()
            .reduce(|a, b| a.hull(&b))
    }
}

/// Canonical organism data for a record or one source feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrganismDescriptor {
    pub taxname:   String,
    pub modifiers: Vec<(ModifierKind, String)>,
    pub genome:    Option<GenomeCode>,
    pub organelle: Option<String>,
    pub lineage:   Option<String>,
    pub taxon_id:  Option<TaxonId>,
    pub mol_type:  Option<MolType>,
    /// Set once the taxonomy service has answered for this organism.
    pub looked_up: bool,
}

impl OrganismDescriptor {
    pub fn from_record(record: &SourceFeatureRecord) -> Self {
        Self {
            taxname:   record.organism.clone(),
            modifiers: record.modifiers.clone(),
            genome:    record.genome,
            organelle: record.organelle.clone(),
            lineage:   None,
            taxon_id:  record.taxon_id,
            mol_type:  record.mol_type,
            looked_up: false,
        }
    }

    /// Name plus modifiers, the same shape as the disambiguation key.
    pub fn full_name(&self) -> String {
        SourceFeatureRecord::make_key(&self.taxname, &self.modifiers)
    }
}

impl Display for OrganismDescriptor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.taxname)?;
        if let Some(genome) = self.genome {
            write!(f, " [{}]", genome)?;
        }
        if !self.modifiers.is_empty() {
            write!(
                f,
                " ({})",
                self.modifiers
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .join(", ")
            )?;
        }
        Ok(())
    }
}
