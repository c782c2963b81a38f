//! Closed sequence intervals and an interval index over them.

use std::fmt::Display;

use itertools::Itertools;
use rust_lapper::{
    Interval,
    Lapper,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::data_structs::enums::Strand;
use crate::data_structs::typedef::{
    PosType,
    SeqPosNum,
};

/// Closed, 1-based interval `[start, end]` on a single sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span<P = PosType>
where
    P: SeqPosNum, {
    start: P,
    end:   P,
}

impl<P> Span<P>
where
    P: SeqPosNum,
{
    /// Creates a new `Span`, swapping the ends when given in reverse.
    pub fn new(
        a: P,
        b: P,
    ) -> Self {
        if a <= b {
            Self { start: a, end: b }
        }
        else {
            Self { start: b, end: a }
        }
    }

    /// Creates a `Span` only if `start <= end`.
    pub fn try_new(
        start: P,
        end: P,
    ) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> P {
        self.start
    }

    pub fn end(&self) -> P {
        self.end
    }

    /// Number of bases covered.
    pub fn length(&self) -> P {
        self.end - self.start + P::one()
    }

    /// Whether this span is exactly `1..len`.
    pub fn is_full(
        &self,
        len: P,
    ) -> bool {
        self.start == P::one() && self.end == len
    }

    /// Checks if this span is fully contained within another span.
    pub fn is_in(
        &self,
        other: &Self,
    ) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    pub fn overlaps(
        &self,
        other: &Self,
    ) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` starts on the base right after this span ends, or the
    /// other way round.
    pub fn is_adjacent(
        &self,
        other: &Self,
    ) -> bool {
        self.end.checked_add(&P::one()) == Some(other.start)
            || other.end.checked_add(&P::one()) == Some(self.start)
    }

    /// Smallest span covering both.
    pub fn hull(
        &self,
        other: &Self,
    ) -> Self {
        Self {
            start: self.start.min(other.start),
            end:   self.end.max(other.end),
        }
    }
}

impl<P> Display for Span<P>
where
    P: SeqPosNum + Display,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        }
        else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// A span with orientation, as produced by location resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeqRange {
    pub span:   Span,
    pub strand: Strand,
}

impl SeqRange {
    pub fn new(
        span: Span,
        strand: Strand,
    ) -> Self {
        Self { span, strand }
    }
}

/// Interval index over closed spans of one sequence, each tagged with a
/// value. Backed by a [`Lapper`], which works on half-open intervals.
#[derive(Debug, Clone)]
pub struct SpanIndex<V>
where
    V: Sync + Send + Eq + Clone, {
    inner: Lapper<PosType, V>,
}

impl<V> Default for SpanIndex<V>
where
    V: Sync + Send + Eq + Clone,
{
    fn default() -> Self {
        Self {
            inner: Lapper::new(vec![]),
        }
    }
}

impl<V> FromIterator<(Span, V)> for SpanIndex<V>
where
    V: Sync + Send + Eq + Clone,
{
    fn from_iter<T: IntoIterator<Item = (Span, V)>>(iter: T) -> Self {
        let intervals = iter
            .into_iter()
            .map(|(span, val)| {
                Interval {
                    start: span.start(),
                    stop:  span.end() + 1,
                    val,
                }
            })
            .collect_vec();
        Self {
            inner: Lapper::new(intervals),
        }
    }
}

impl<V> SpanIndex<V>
where
    V: Sync + Send + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn insert(
        &mut self,
        span: Span,
        value: V,
    ) {
        self.inner.insert(Interval {
            start: span.start(),
            stop:  span.end() + 1,
            val:   value,
        });
    }

    /// All stored values whose span shares at least one base with `span`,
    /// ordered by their start.
    pub fn find(
        &self,
        span: &Span,
    ) -> Vec<(Span, &V)> {
        self.inner
            .find(span.start(), span.end() + 1)
            .map(|iv| (Span::new(iv.start, iv.stop - 1), &iv.val))
            .sorted_by_key(|(s, _)| *s)
            .collect_vec()
    }

    /// Stored spans in start order.
    pub fn spans(&self) -> Vec<(Span, &V)> {
        self.inner
            .iter()
            .map(|iv| (Span::new(iv.start, iv.stop - 1), &iv.val))
            .sorted_by_key(|(s, _)| *s)
            .collect_vec()
    }
}
