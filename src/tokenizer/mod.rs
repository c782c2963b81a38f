//! Splits a raw feature block into an ordered qualifier list.
//!
//! Qualifier text is line oriented: every qualifier starts on a line
//! beginning with `/`. Quoted values may wrap over any number of lines and
//! may contain quote characters of their own, so a closing quote is only
//! believed when it ends a line that is followed by the end of the block or
//! by a line opening a qualifier the grammar knows. Anything that fails to
//! close is dropped with a warning; the tokenizer never aborts a record.

use itertools::Itertools;
use log::trace;

use crate::collaborators::QualifierGrammar;
use crate::data_structs::{
    ParsedFeature,
    Qualifier,
    QualifierKind,
    RawFeatureBlock,
};
use crate::diagnostics::{
    DiagnosticContext,
    Diagnostics,
    ErrorCode,
};
use crate::utils::{
    collapse_blanks,
    strip_blanks,
};

#[cfg(test)]
mod tests;

/// Separator placed between merged `/note` values.
pub const NOTE_SEPARATOR: &str = "; ~";

enum RawValue {
    Absent,
    Quoted(String),
    Bare(String),
}

pub struct QualifierTokenizer<'g> {
    grammar: &'g dyn QualifierGrammar,
}

impl<'g> QualifierTokenizer<'g> {
    pub fn new(grammar: &'g dyn QualifierGrammar) -> Self {
        Self { grammar }
    }

    pub fn tokenize(
        &self,
        block: &RawFeatureBlock,
        diags: &mut Diagnostics,
    ) -> ParsedFeature {
        let ctx = diags.context(&block.key, &block.location);
        let lines = block
            .qualifiers
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect_vec();

        let mut qualifiers = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            i += 1;
            if !line.starts_with('/') {
                diags.warn(
                    ErrorCode::StrayText,
                    ctx.clone(),
                    format!("Text outside any qualifier ignored: {}", line),
                );
                continue;
            }

            let body = &line[1..];
            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (body.trim(), None),
            };
            if name.is_empty() || name.contains(char::is_whitespace) {
                diags.warn(
                    ErrorCode::MalformedQualifier,
                    ctx.clone(),
                    format!("Malformed qualifier: {}", line),
                );
                continue;
            }

            let raw = match value {
                None => RawValue::Absent,
                Some(v) if v.starts_with('"') => {
                    match self.read_quoted(&v[1..], &lines, &mut i) {
                        Some(text) => RawValue::Quoted(text),
                        None => {
                            diags.warn(
                                ErrorCode::UnbalancedQuotes,
                                ctx.clone(),
                                format!("/{} has no closing quote, qualifier dropped", name),
                            );
                            continue;
                        },
                    }
                },
                Some(v) => {
                    let mut text = v.to_string();
                    while i < lines.len() && !lines[i].starts_with('/') {
                        text.push_str(lines[i]);
                        i += 1;
                    }
                    RawValue::Bare(text)
                },
            };

            if let Some(qualifier) = self.finish(name, raw, &ctx, diags) {
                qualifiers.push(qualifier);
            }
        }

        merge_notes(&mut qualifiers);
        trace!(
            "Tokenized {} {} into {} qualifiers",
            block.key,
            block.location,
            qualifiers.len()
        );
        ParsedFeature::new(
            block.order,
            block.key.clone(),
            block.location.clone(),
            qualifiers,
        )
    }

    pub fn tokenize_all(
        &self,
        blocks: &[RawFeatureBlock],
        diags: &mut Diagnostics,
    ) -> Vec<ParsedFeature> {
        blocks
            .iter()
            .map(|b| self.tokenize(b, diags))
            .collect()
    }

    /// Whether `line` opens a qualifier the grammar knows.
    fn opens_known_qualifier(
        &self,
        line: &str,
    ) -> bool {
        line.strip_prefix('/')
            .map(|body| {
                let name = body
                    .split_once('=')
                    .map(|(n, _)| n)
                    .unwrap_or(body)
                    .trim();
                self.grammar.is_known_qualifier(name)
            })
            .unwrap_or(false)
    }

    /// Reads a quoted value starting after its opening quote. `next` points
    /// at the line after the one holding the opening quote and is advanced
    /// past every line consumed. Returns `None` if the value never closes.
    fn read_quoted(
        &self,
        first: &str,
        lines: &[&str],
        next: &mut usize,
    ) -> Option<String> {
        let mut pieces = Vec::new();
        let mut current = first;
        loop {
            let following = lines.get(*next).copied();
            let may_close = following
                .map(|l| self.opens_known_qualifier(l))
                .unwrap_or(true);
            let (text, closed) = scan_quoted_line(current, may_close);
            pieces.push(text);
            if closed {
                return Some(collapse_blanks(&pieces.join(" ")));
            }
            match following {
                Some(line) if !self.opens_known_qualifier(line) => {
                    current = line;
                    *next += 1;
                },
                _ => return None,
            }
        }
    }

    /// Applies the value legality table and per-qualifier clean-ups.
    fn finish(
        &self,
        name: &str,
        raw: RawValue,
        ctx: &DiagnosticContext,
        diags: &mut Diagnostics,
    ) -> Option<Qualifier> {
        let kind = QualifierKind::from_name(name);
        let (value, quoted) = match raw {
            RawValue::Absent => (None, false),
            RawValue::Quoted(v) => (Some(v), true),
            RawValue::Bare(v) => (Some(v), false),
        };

        if kind.is_valueless() {
            if value.is_some() {
                diags.error(
                    ErrorCode::UnexpectedQualifierValue,
                    ctx.clone(),
                    format!("/{} takes no value, value discarded", name),
                );
            }
            return Some(Qualifier::flag(name));
        }

        let mut value = match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                diags.warn(
                    ErrorCode::MissingQualifierValue,
                    ctx.clone(),
                    format!("/{} has no value, qualifier dropped", name),
                );
                return None;
            },
        };

        match kind {
            QualifierKind::Translation | QualifierKind::Replace => {
                value = strip_blanks(&value);
            },
            QualifierKind::RptUnit | QualifierKind::RptUnitSeq => {
                value = value.to_ascii_lowercase();
            },
            QualifierKind::Note => {
                if value.matches('"').count() % 2 == 1 {
                    diags.warn(
                        ErrorCode::NoteUnbalancedQuotes,
                        ctx.clone(),
                        "/note has unbalanced quotes, qualifier dropped",
                    );
                    return None;
                }
                if let Some(embedded) = self.embedded_qualifier(&value) {
                    diags.warn(
                        ErrorCode::NoteEmbedsQualifier,
                        ctx.clone(),
                        format!("/note contains what looks like a /{} qualifier", embedded),
                    );
                }
            },
            _ => {},
        }

        Some(Qualifier {
            kind,
            name: name.to_string(),
            value: Some(value),
            quoted,
        })
    }

    /// First `/name=` inside `text` whose name is a known qualifier.
    fn embedded_qualifier(
        &self,
        text: &str,
    ) -> Option<String> {
        text.match_indices('/').find_map(|(pos, _)| {
            let tail = &text[pos + 1..];
            let len = tail
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .count();
            let name = &tail[..len];
            (len > 0
                && tail[len..].starts_with('=')
                && self.grammar.is_known_qualifier(name))
            .then(|| name.to_string())
        })
    }
}

/// Scans one line of a quoted value. `""` is an escaped quote; a single
/// quote closes the value only as the last character of the line and only
/// when `may_close` holds. Returns the unescaped text and whether the value
/// closed.
fn scan_quoted_line(
    line: &str,
    may_close: bool,
) -> (String, bool) {
    let chars = line.chars().collect_vec();
    let mut out = String::with_capacity(line.len());
    let mut k = 0;
    while k < chars.len() {
        let c = chars[k];
        if c == '"' {
            if chars.get(k + 1) == Some(&'"') {
                out.push('"');
                k += 2;
                continue;
            }
            if k + 1 == chars.len() && may_close {
                return (out, true);
            }
        }
        out.push(c);
        k += 1;
    }
    (out, false)
}

/// Folds every `/note` into the first one.
fn merge_notes(qualifiers: &mut Vec<Qualifier>) {
    let notes = qualifiers
        .iter()
        .filter(|q| q.kind == QualifierKind::Note)
        .filter_map(|q| q.value.clone())
        .collect_vec();
    if notes.len() < 2 {
        return;
    }
    let merged = notes.join(NOTE_SEPARATOR);
    let mut seen = false;
    qualifiers.retain_mut(|q| {
        if q.kind != QualifierKind::Note {
            return true;
        }
        if seen {
            return false;
        }
        seen = true;
        q.value = Some(merged.clone());
        true
    });
}
