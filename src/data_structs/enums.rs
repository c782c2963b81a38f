use std::convert::Infallible;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

use serde::{
    Deserialize,
    Serialize,
};

/// Severity of a [`crate::diagnostics::Diagnostic`]. Ordered from least to
/// most severe; `Reject` and `Fatal` abort the current record.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Reject,
    Fatal,
}

impl Severity {
    pub fn aborts_record(&self) -> bool {
        *self >= Severity::Reject
    }
}

impl Display for Severity {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Reject => "REJECT",
            Severity::Fatal => "FATAL",
        })
    }
}

#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum Strand {
    /// Forward strand.
    Forward,
    /// Reverse strand.
    Reverse,
    /// No strand.
    None,
}

impl FromStr for Strand {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Ok(Strand::None),
        }
    }
}

impl Strand {
    /// Strand seen from inside one more `complement(...)`.
    pub fn flip(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
            Strand::None => Strand::None,
        }
    }
}

impl Display for Strand {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::None => ".",
        })
    }
}

impl Serialize for Strand {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer, {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Strand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>, {
        let s = String::deserialize(deserializer)?;
        std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Database the record was submitted through. Several gap checks are
/// relaxed for specific sources.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub enum SourceDb {
    #[default]
    Ncbi,
    Embl,
    Ddbj,
    Lanl,
    RefSeq,
    FlyBase,
    Uspto,
    SwissProt,
}

impl FromStr for SourceDb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ncbi" | "genbank" => Ok(SourceDb::Ncbi),
            "embl" | "ena" => Ok(SourceDb::Embl),
            "ddbj" => Ok(SourceDb::Ddbj),
            "lanl" => Ok(SourceDb::Lanl),
            "refseq" => Ok(SourceDb::RefSeq),
            "flybase" => Ok(SourceDb::FlyBase),
            "uspto" => Ok(SourceDb::Uspto),
            "sprot" | "swissprot" => Ok(SourceDb::SwissProt),
            other => anyhow::bail!("Unknown source database: {}", other),
        }
    }
}

/// HTG (high-throughput genomic) sequencing phase of the record, taken from
/// its keyword line.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HtgPhase {
    #[default]
    None,
    Phase0,
    Phase1,
    Phase2,
    Phase3,
}

impl HtgPhase {
    pub fn is_htg(&self) -> bool {
        *self != HtgPhase::None
    }

    /// Phases 0 and 1 are draft stages where gap linkage is expected to be
    /// `unspecified`.
    pub fn is_draft(&self) -> bool {
        matches!(self, HtgPhase::Phase0 | HtgPhase::Phase1)
    }

    /// Derives the phase from a record's keywords (`HTG`, `HTGS_PHASE0`, ...).
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut phase = HtgPhase::None;
        for keyword in keywords {
            let kw = keyword.as_ref().trim().to_ascii_uppercase();
            let found = match kw.as_str() {
                "HTGS_PHASE0" => HtgPhase::Phase0,
                "HTGS_PHASE1" => HtgPhase::Phase1,
                "HTGS_PHASE2" => HtgPhase::Phase2,
                "HTGS_PHASE3" => HtgPhase::Phase3,
                _ => continue,
            };
            phase = phase.max(found);
        }
        phase
    }
}

/// Genome/organelle code carried by a source feature.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenomeCode {
    Mitochondrion,
    Chloroplast,
    Kinetoplast,
    Cyanelle,
    Plastid,
    Chromoplast,
    Macronuclear,
    Extrachromosomal,
    Plasmid,
}

impl GenomeCode {
    pub const ALL: [GenomeCode; 9] = [
        GenomeCode::Mitochondrion,
        GenomeCode::Chloroplast,
        GenomeCode::Kinetoplast,
        GenomeCode::Cyanelle,
        GenomeCode::Plastid,
        GenomeCode::Chromoplast,
        GenomeCode::Macronuclear,
        GenomeCode::Extrachromosomal,
        GenomeCode::Plasmid,
    ];

    /// Keyword as it appears inside an `/organism` value.
    pub fn keyword(&self) -> &'static str {
        match self {
            GenomeCode::Mitochondrion => "mitochondrion",
            GenomeCode::Chloroplast => "chloroplast",
            GenomeCode::Kinetoplast => "kinetoplast",
            GenomeCode::Cyanelle => "cyanelle",
            GenomeCode::Plastid => "plastid",
            GenomeCode::Chromoplast => "chromoplast",
            GenomeCode::Macronuclear => "macronuclear",
            GenomeCode::Extrachromosomal => "extrachromosomal",
            GenomeCode::Plasmid => "plasmid",
        }
    }

    /// Maps an INSDC `/organelle` value onto a genome code. Legal organelles
    /// without a code of their own (nucleomorph, hydrogenosome, ...) map to
    /// `Ok(None)`; anything else is an error.
    pub fn from_organelle(value: &str) -> anyhow::Result<Option<Self>> {
        let code = match value {
            "mitochondrion" => Some(GenomeCode::Mitochondrion),
            "mitochondrion:kinetoplast" => Some(GenomeCode::Kinetoplast),
            "plastid" => Some(GenomeCode::Plastid),
            "plastid:chloroplast" => Some(GenomeCode::Chloroplast),
            "plastid:chromoplast" => Some(GenomeCode::Chromoplast),
            "plastid:cyanelle" => Some(GenomeCode::Cyanelle),
            "plastid:apicoplast" | "plastid:leucoplast" | "plastid:proplastid" => {
                Some(GenomeCode::Plastid)
            },
            "nucleomorph" | "hydrogenosome" | "chromatophore" => None,
            other => anyhow::bail!("Illegal organelle value: {}", other),
        };
        Ok(code)
    }
}

impl Display for GenomeCode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// `/gap_type` values accepted on `assembly_gap` features.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum GapType {
    BetweenScaffolds,
    WithinScaffold,
    Telomere,
    Centromere,
    ShortArm,
    Heterochromatin,
    RepeatWithinScaffold,
    RepeatBetweenScaffolds,
    Contamination,
}

impl GapType {
    /// Gap types that must carry at least one `/linkage_evidence`; all
    /// others must carry none.
    pub fn requires_linkage(&self) -> bool {
        matches!(self, GapType::WithinScaffold | GapType::RepeatWithinScaffold)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GapType::BetweenScaffolds => "between scaffolds",
            GapType::WithinScaffold => "within scaffold",
            GapType::Telomere => "telomere",
            GapType::Centromere => "centromere",
            GapType::ShortArm => "short arm",
            GapType::Heterochromatin => "heterochromatin",
            GapType::RepeatWithinScaffold => "repeat within scaffold",
            GapType::RepeatBetweenScaffolds => "repeat between scaffolds",
            GapType::Contamination => "contamination",
        }
    }
}

impl FromStr for GapType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "between scaffolds" => Ok(GapType::BetweenScaffolds),
            "within scaffold" => Ok(GapType::WithinScaffold),
            "telomere" => Ok(GapType::Telomere),
            "centromere" => Ok(GapType::Centromere),
            "short arm" => Ok(GapType::ShortArm),
            "heterochromatin" => Ok(GapType::Heterochromatin),
            "repeat within scaffold" => Ok(GapType::RepeatWithinScaffold),
            "repeat between scaffolds" => Ok(GapType::RepeatBetweenScaffolds),
            "contamination" => Ok(GapType::Contamination),
            other => anyhow::bail!("Invalid gap_type: {}", other),
        }
    }
}

impl Display for GapType {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `/linkage_evidence` values.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum LinkageEvidence {
    PairedEnds,
    AlignGenus,
    AlignXgenus,
    AlignTrnscpt,
    WithinClone,
    CloneContig,
    Map,
    Strobe,
    Unspecified,
    Pcr,
    ProximityLigation,
}

impl LinkageEvidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkageEvidence::PairedEnds => "paired-ends",
            LinkageEvidence::AlignGenus => "align genus",
            LinkageEvidence::AlignXgenus => "align xgenus",
            LinkageEvidence::AlignTrnscpt => "align trnscpt",
            LinkageEvidence::WithinClone => "within clone",
            LinkageEvidence::CloneContig => "clone contig",
            LinkageEvidence::Map => "map",
            LinkageEvidence::Strobe => "strobe",
            LinkageEvidence::Unspecified => "unspecified",
            LinkageEvidence::Pcr => "pcr",
            LinkageEvidence::ProximityLigation => "proximity ligation",
        }
    }
}

impl FromStr for LinkageEvidence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paired-ends" => Ok(LinkageEvidence::PairedEnds),
            "align genus" => Ok(LinkageEvidence::AlignGenus),
            "align xgenus" => Ok(LinkageEvidence::AlignXgenus),
            "align trnscpt" => Ok(LinkageEvidence::AlignTrnscpt),
            "within clone" => Ok(LinkageEvidence::WithinClone),
            "clone contig" => Ok(LinkageEvidence::CloneContig),
            "map" => Ok(LinkageEvidence::Map),
            "strobe" => Ok(LinkageEvidence::Strobe),
            "unspecified" => Ok(LinkageEvidence::Unspecified),
            "pcr" => Ok(LinkageEvidence::Pcr),
            "proximity ligation" => Ok(LinkageEvidence::ProximityLigation),
            other => anyhow::bail!("Invalid linkage_evidence: {}", other),
        }
    }
}

impl Display for LinkageEvidence {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `/mol_type` values.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum MolType {
    GenomicDna,
    GenomicRna,
    Mrna,
    Trna,
    Rrna,
    OtherRna,
    OtherDna,
    TranscribedRna,
    ViralCrna,
    UnassignedDna,
    UnassignedRna,
}

impl MolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MolType::GenomicDna => "genomic DNA",
            MolType::GenomicRna => "genomic RNA",
            MolType::Mrna => "mRNA",
            MolType::Trna => "tRNA",
            MolType::Rrna => "rRNA",
            MolType::OtherRna => "other RNA",
            MolType::OtherDna => "other DNA",
            MolType::TranscribedRna => "transcribed RNA",
            MolType::ViralCrna => "viral cRNA",
            MolType::UnassignedDna => "unassigned DNA",
            MolType::UnassignedRna => "unassigned RNA",
        }
    }

    pub fn is_dna(&self) -> bool {
        matches!(
            self,
            MolType::GenomicDna | MolType::OtherDna | MolType::UnassignedDna
        )
    }
}

impl FromStr for MolType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "genomic DNA" => Ok(MolType::GenomicDna),
            "genomic RNA" => Ok(MolType::GenomicRna),
            "mRNA" => Ok(MolType::Mrna),
            "tRNA" => Ok(MolType::Trna),
            "rRNA" => Ok(MolType::Rrna),
            "other RNA" => Ok(MolType::OtherRna),
            "other DNA" => Ok(MolType::OtherDna),
            "transcribed RNA" => Ok(MolType::TranscribedRna),
            "viral cRNA" => Ok(MolType::ViralCrna),
            "unassigned DNA" => Ok(MolType::UnassignedDna),
            "unassigned RNA" => Ok(MolType::UnassignedRna),
            other => anyhow::bail!("Invalid mol_type: {}", other),
        }
    }
}

impl Display for MolType {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Molecule type declared on the record's LOCUS/ID line.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum RecordMolecule {
    Dna,
    Rna,
    Mrna,
    Rrna,
    Trna,
    Protein,
}

impl FromStr for RecordMolecule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix("ss-")
            .or_else(|| trimmed.strip_prefix("ds-"))
            .or_else(|| trimmed.strip_prefix("ms-"))
            .unwrap_or(trimmed);
        match bare.to_ascii_lowercase().as_str() {
            "dna" | "genomic dna" | "other dna" | "unassigned dna" => Ok(RecordMolecule::Dna),
            "rna" | "genomic rna" | "other rna" | "viral crna" | "transcribed rna"
            | "unassigned rna" => Ok(RecordMolecule::Rna),
            "mrna" => Ok(RecordMolecule::Mrna),
            "rrna" => Ok(RecordMolecule::Rrna),
            "trna" => Ok(RecordMolecule::Trna),
            "aa" | "protein" => Ok(RecordMolecule::Protein),
            other => anyhow::bail!("Unparseable molecule type: {}", other),
        }
    }
}

impl RecordMolecule {
    /// Whether a source feature's `/mol_type` is plausible for this molecule.
    pub fn accepts(
        &self,
        mol_type: MolType,
    ) -> bool {
        match self {
            RecordMolecule::Dna => mol_type.is_dna(),
            RecordMolecule::Mrna => mol_type == MolType::Mrna,
            RecordMolecule::Rrna => mol_type == MolType::Rrna,
            RecordMolecule::Trna => mol_type == MolType::Trna,
            RecordMolecule::Rna => !mol_type.is_dna(),
            RecordMolecule::Protein => true,
        }
    }
}
