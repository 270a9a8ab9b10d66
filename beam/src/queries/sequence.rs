// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Sequenced and indexed value wrappers. See [`Sequence`],
//! [`SequencedValue`], and [`IndexedValue`].

use chrono::{DateTime, Utc};

/// A monotonic position defining a value's total order within one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(u64);

impl Sequence {
    /// The lowest assignable sequence.
    pub const FIRST: Sequence = Sequence(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The next sequence. Saturates at the maximum.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The previous sequence, or `None` at [`Sequence::FIRST`].
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self.0.checked_sub(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Sequence {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A payload tagged with the sequence that orders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencedValue<T> {
    pub value: T,
    pub sequence: Sequence,
}

impl<T> SequencedValue<T> {
    pub fn new(value: T, sequence: Sequence) -> Self {
        Self { value, sequence }
    }
}

/// A payload tagged with the index (partition key) it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedValue<V, K> {
    pub value: V,
    pub index: K,
}

impl<V, K> IndexedValue<V, K> {
    pub fn new(value: V, index: K) -> Self {
        Self { value, index }
    }
}

/// The storage core's unit of writing: a value tagged by both its index and
/// its per-index sequence.
pub type SequencedIndexedValue<V, K> = SequencedValue<IndexedValue<V, K>>;

/// Builds a [`SequencedIndexedValue`] in one call.
pub fn sequenced_indexed_value<V, K>(
    value: V,
    index: K,
    sequence: Sequence,
) -> SequencedIndexedValue<V, K> {
    SequencedValue::new(IndexedValue::new(value, index), sequence)
}

/// Access to a value's wall-clock timestamp, used by time-bounded query
/// ranges.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_ordering_and_navigation() {
        let five = Sequence::new(5);
        assert!(five < five.next());
        assert_eq!(five.next().previous(), Some(five));
        assert_eq!(Sequence::FIRST.previous(), None);
    }
}
