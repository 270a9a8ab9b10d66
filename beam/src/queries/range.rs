// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Query ranges over sequences and timestamps. See [`Range`].

use super::sequence::{Sequence, Timestamped};
use chrono::{DateTime, Utc};

/// One end of a query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// Open-ended.
    Unbounded,
    /// Bounded (inclusive) by a sequence.
    At(Sequence),
    /// Bounded (inclusive) by a wall-clock timestamp.
    When(DateTime<Utc>),
}

/// The interval of values a load observes. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub begin: RangeBound,
    pub end: RangeBound,
}

impl Default for Range {
    fn default() -> Self {
        Self::total()
    }
}

impl Range {
    /// The whole history of an index.
    #[must_use]
    pub const fn total() -> Self {
        Self {
            begin: RangeBound::Unbounded,
            end: RangeBound::Unbounded,
        }
    }

    #[must_use]
    pub const fn new(begin: RangeBound, end: RangeBound) -> Self {
        Self { begin, end }
    }

    /// An inclusive sequence interval.
    #[must_use]
    pub const fn between(from: Sequence, to: Sequence) -> Self {
        Self {
            begin: RangeBound::At(from),
            end: RangeBound::At(to),
        }
    }

    /// True when a value at `sequence` falls inside this range.
    pub fn contains<V: Timestamped>(&self, sequence: Sequence, value: &V) -> bool {
        let after_begin = match self.begin {
            RangeBound::Unbounded => true,
            RangeBound::At(from) => sequence >= from,
            RangeBound::When(from) => value.timestamp() >= from,
        };
        let before_end = match self.end {
            RangeBound::Unbounded => true,
            RangeBound::At(to) => sequence <= to,
            RangeBound::When(to) => value.timestamp() <= to,
        };
        after_begin && before_end
    }
}
