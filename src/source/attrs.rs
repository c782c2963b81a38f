//! Grammars of the structured source qualifiers `/PCR_primers` and
//! `/collection_date`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::data_structs::{
    CollectionDate,
    PartialDate,
    PcrPrimerSet,
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

static DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-([A-Z][a-z]{2})-(\d{4})$").unwrap());
static MY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z][a-z]{2})-(\d{4})$").unwrap());
static Y_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());
static ISO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})(?:-(\d{2})(?:T(\d{2})(?::(\d{2})(?::(\d{2}))?)?Z)?)?$").unwrap()
});

/// Why a `/PCR_primers` value was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimerError {
    #[error("field '{0}' is out of order")]
    FieldOrder(String),
    #[error("missing mandatory '{0}'")]
    MissingSequence(&'static str),
    #[error("unknown field '{0}'")]
    UnknownLabel(String),
    #[error("illegal base in primer sequence '{0}'")]
    BadBase(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PrimerField {
    FwdName,
    FwdSeq,
    RevName,
    RevSeq,
}

impl PrimerField {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "fwd_name" => Some(PrimerField::FwdName),
            "fwd_seq" => Some(PrimerField::FwdSeq),
            "rev_name" => Some(PrimerField::RevName),
            "rev_seq" => Some(PrimerField::RevSeq),
            _ => None,
        }
    }

    fn is_forward(&self) -> bool {
        matches!(self, PrimerField::FwdName | PrimerField::FwdSeq)
    }

    fn is_name(&self) -> bool {
        matches!(self, PrimerField::FwdName | PrimerField::RevName)
    }

    fn sequence_of(&self) -> Self {
        match self {
            PrimerField::FwdName | PrimerField::FwdSeq => PrimerField::FwdSeq,
            PrimerField::RevName | PrimerField::RevSeq => PrimerField::RevSeq,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PrimerField::FwdName => "fwd_name",
            PrimerField::FwdSeq => "fwd_seq",
            PrimerField::RevName => "rev_name",
            PrimerField::RevSeq => "rev_seq",
        }
    }
}

/// Parses `fwd_name: X, fwd_seq: acgt, rev_name: Y, rev_seq: tgca`. Names
/// are optional; each one must be followed directly by its sequence, and
/// every forward field comes before any reverse field.
pub fn parse_pcr_primers(value: &str) -> Result<PcrPrimerSet, PrimerError> {
    let mut set = PcrPrimerSet::default();
    let mut previous: Option<PrimerField> = None;
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (label, text) = part
            .split_once(':')
            .map(|(l, t)| (l.trim(), t.trim()))
            .ok_or_else(|| PrimerError::UnknownLabel(part.to_string()))?;
        let field =
            PrimerField::from_label(label).ok_or_else(|| PrimerError::UnknownLabel(label.to_string()))?;

        if let Some(prev) = previous {
            let went_back = field.is_forward() && !prev.is_forward();
            let name_unfollowed = prev.is_name() && field != prev.sequence_of();
            if went_back || name_unfollowed {
                return Err(PrimerError::FieldOrder(label.to_string()));
            }
        }
        previous = Some(field);

        match field {
            PrimerField::FwdName => set.fwd_name.push(text.to_string()),
            PrimerField::RevName => set.rev_name.push(text.to_string()),
            PrimerField::FwdSeq | PrimerField::RevSeq => {
                check_primer_bases(text)?;
                let seq = text.to_ascii_lowercase();
                if field == PrimerField::FwdSeq {
                    set.fwd_seq.push(seq)
                }
                else {
                    set.rev_seq.push(seq)
                }
            },
        }
    }

    if let Some(prev) = previous {
        if prev.is_name() {
            return Err(PrimerError::FieldOrder(prev.label().to_string()));
        }
    }
    if set.fwd_seq.is_empty() {
        return Err(PrimerError::MissingSequence("fwd_seq"));
    }
    if set.rev_seq.is_empty() {
        return Err(PrimerError::MissingSequence("rev_seq"));
    }
    Ok(set)
}

/// IUPAC nucleotide letters, or `<...>` modified-base tokens.
fn check_primer_bases(seq: &str) -> Result<(), PrimerError> {
    let mut rest = seq;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            match rest.find('>') {
                Some(end) if end > 1 => {
                    rest = &rest[end + 1..];
                    continue;
                },
                _ => return Err(PrimerError::BadBase(seq.to_string())),
            }
        }
        if !"acgtumrwsykvhdbn".contains(c.to_ascii_lowercase()) {
            return Err(PrimerError::BadBase(seq.to_string()));
        }
        rest = &rest[c.len_utf8()..];
    }
    if seq.is_empty() {
        return Err(PrimerError::BadBase(seq.to_string()));
    }
    Ok(())
}

fn month_number(abbrev: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}

fn checked(
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
) -> anyhow::Result<PartialDate> {
    let date = PartialDate { year, month, day };
    if date.earliest().is_none() {
        anyhow::bail!("No such date: {}", date);
    }
    Ok(date)
}

fn parse_single_date(text: &str) -> anyhow::Result<PartialDate> {
    if let Some(caps) = DMY_RE.captures(text) {
        let month = month_number(&caps[2])
            .ok_or_else(|| anyhow::anyhow!("Unknown month: {}", &caps[2]))?;
        return checked(caps[3].parse()?, Some(month), Some(caps[1].parse()?));
    }
    if let Some(caps) = MY_RE.captures(text) {
        let month = month_number(&caps[1])
            .ok_or_else(|| anyhow::anyhow!("Unknown month: {}", &caps[1]))?;
        return checked(caps[2].parse()?, Some(month), None);
    }
    if let Some(caps) = Y_RE.captures(text) {
        return checked(caps[1].parse()?, None, None);
    }
    if let Some(caps) = ISO_RE.captures(text) {
        let day = caps
            .get(3)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()?;
        let limits = [(4, 23), (5, 59), (6, 59)];
        for (group, max) in limits {
            if let Some(m) = caps.get(group) {
                if m.as_str().parse::<u32>()? > max {
                    anyhow::bail!("Time out of range in {}", text);
                }
            }
        }
        return checked(caps[1].parse()?, Some(caps[2].parse()?), day);
    }
    anyhow::bail!("Unrecognized date format: {}", text)
}

/// Parses a `/collection_date` value: a single date or a `from/to` range
/// with `from` not after `to`.
pub fn parse_collection_date(value: &str) -> anyhow::Result<CollectionDate> {
    let value = value.trim();
    match value.split_once('/') {
        Some((from, to)) => {
            let from = parse_single_date(from.trim())?;
            let to = parse_single_date(to.trim())?;
            if from.earliest() > to.earliest() {
                anyhow::bail!("Date range runs backwards: {}", value);
            }
            Ok(CollectionDate { from, to: Some(to) })
        },
        None => {
            Ok(CollectionDate {
                from: parse_single_date(value)?,
                to:   None,
            })
        },
    }
}

/// Whether the collection date lies after `today`.
pub fn is_future(
    date: &CollectionDate,
    today: NaiveDate,
) -> bool {
    date.last()
        .earliest()
        .map(|d| d > today)
        .unwrap_or(false)
}
