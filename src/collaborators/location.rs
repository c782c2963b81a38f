//! Location strings to coordinate ranges.

use anyhow::anyhow;
use log::debug;
use serde::Serialize;

use crate::data_structs::enums::Strand;
use crate::data_structs::typedef::PosType;
use crate::data_structs::{
    SeqRange,
    Span,
};

/// Outcome of resolving one location string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedLocation {
    pub ranges:      Vec<SeqRange>,
    /// `<`, `>` or a one-of position was used somewhere.
    pub fuzzy:       bool,
    pub error_count: usize,
}

impl ResolvedLocation {
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    pub fn extent(&self) -> Option<Span> {
        self.ranges
            .iter()
            .map(|r| r.span)
            .reduce(|a, b| a.hull(&b))
    }
}

/// Turns a feature location into coordinate ranges on the record's own
/// sequence. Implementations must be shareable across worker threads.
pub trait LocationResolver: Send + Sync {
    fn resolve(
        &self,
        location: &str,
        sequence_ids: &[String],
    ) -> ResolvedLocation;
}

/// Resolver for the INSDC location grammar: `complement`, `join`, `order`,
/// `bond`, `a..b`, `a^b`, single bases, `<`/`>` partial ends, `(a.b)`
/// one-of positions and `ACC:` references. A reference to an accession not
/// among the record's own ids counts as an error and yields no range.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsdcLocationResolver;

impl LocationResolver for InsdcLocationResolver {
    fn resolve(
        &self,
        location: &str,
        sequence_ids: &[String],
    ) -> ResolvedLocation {
        let compact: String = location
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let mut parser = LocationParser {
            text: compact.as_bytes(),
            pos: 0,
            sequence_ids,
            out: ResolvedLocation::default(),
        };
        let result = parser
            .parse_location(Strand::Forward)
            .and_then(|_| {
                if parser.pos == parser.text.len() {
                    Ok(())
                }
                else {
                    Err(anyhow!("Trailing text at offset {}", parser.pos))
                }
            });
        if let Err(e) = result {
            debug!("Could not resolve location '{}': {}", location, e);
            parser.out.error_count += 1;
        }
        parser.out
    }
}

struct LocationParser<'a> {
    text:         &'a [u8],
    pos:          usize,
    sequence_ids: &'a [String],
    out:          ResolvedLocation,
}

impl LocationParser<'_> {
    fn rest(&self) -> &[u8] {
        &self.text[self.pos..]
    }

    fn eat(
        &mut self,
        token: &str,
    ) -> bool {
        if self.rest().starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        }
        else {
            false
        }
    }

    fn expect(
        &mut self,
        token: &str,
    ) -> anyhow::Result<()> {
        if self.eat(token) {
            Ok(())
        }
        else {
            Err(anyhow!("Expected '{}' at offset {}", token, self.pos))
        }
    }

    fn parse_location(
        &mut self,
        strand: Strand,
    ) -> anyhow::Result<()> {
        if self.eat("complement(") {
            self.parse_location(strand.flip())?;
            return self.expect(")");
        }
        for op in ["join(", "order(", "bond(", "one-of("] {
            if self.eat(op) {
                self.parse_location(strand)?;
                while self.eat(",") {
                    self.parse_location(strand)?;
                }
                return self.expect(")");
            }
        }
        self.parse_interval(strand)
    }

    fn parse_interval(
        &mut self,
        strand: Strand,
    ) -> anyhow::Result<()> {
        let remote = self.parse_accession();

        let start = self.parse_position(true)?;
        let end = if self.eat("..") {
            self.parse_position(false)?
        }
        else if self.eat("^") {
            self.parse_position(false)?
        }
        else {
            start
        };

        match remote {
            Some(acc) if !self.is_own(&acc) => {
                debug!("Location refers to another sequence: {}", acc);
                self.out.error_count += 1;
            },
            _ => {
                self.out
                    .ranges
                    .push(SeqRange::new(Span::new(start, end), strand));
            },
        }
        Ok(())
    }

    /// Reads an `ACC.v:` prefix if one is present.
    fn parse_accession(&mut self) -> Option<String> {
        let rest = self.rest();
        let len = rest
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'.' || **b == b'_')
            .count();
        let looks_like_acc = len > 0
            && rest.get(len) == Some(&b':')
            && rest[0].is_ascii_alphabetic();
        if !looks_like_acc {
            return None;
        }
        let acc = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Some(acc)
    }

    fn is_own(
        &self,
        accession: &str,
    ) -> bool {
        let bare = accession
            .split_once('.')
            .map(|(a, _)| a)
            .unwrap_or(accession);
        self.sequence_ids.iter().any(|id| {
            id == accession
                || id
                    .split_once('.')
                    .map(|(a, _)| a)
                    .unwrap_or(id)
                    == bare
        })
    }

    /// One base position. For `(a.b)` the lower bound is used at a start
    /// and the upper bound at an end.
    fn parse_position(
        &mut self,
        is_start: bool,
    ) -> anyhow::Result<PosType> {
        if self.eat("<") || self.eat(">") {
            self.out.fuzzy = true;
        }
        if self.eat("(") {
            let low = self.parse_number()?;
            self.expect(".")?;
            let high = self.parse_number()?;
            self.expect(")")?;
            self.out.fuzzy = true;
            return Ok(if is_start { low.min(high) } else { low.max(high) });
        }
        self.parse_number()
    }

    fn parse_number(&mut self) -> anyhow::Result<PosType> {
        let digits = self
            .rest()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            anyhow::bail!("Expected a number at offset {}", self.pos);
        }
        let text = std::str::from_utf8(&self.rest()[..digits])?;
        let value: PosType = text.parse()?;
        self.pos += digits;
        if value == 0 {
            anyhow::bail!("Base positions start at 1");
        }
        Ok(value)
    }
}
