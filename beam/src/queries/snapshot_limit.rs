// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Load-size directives. See [`SnapshotLimit`].

/// Instructs a load to keep only part of its result range. Applied *after*
/// in-flight buffers are merged with backend contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotLimit {
    /// Keep every value in the range.
    #[default]
    Unlimited,
    /// Keep the first `n` values of the range.
    Head(usize),
    /// Keep the last `n` values of the range.
    Tail(usize),
}

impl SnapshotLimit {
    /// True for `Head(0)` / `Tail(0)`: the result is empty regardless of
    /// contents.
    #[must_use]
    pub fn is_empty(self) -> bool {
        matches!(self, SnapshotLimit::Head(0) | SnapshotLimit::Tail(0))
    }

    /// Applies this limit to an already-merged, sequence-ordered result.
    #[must_use]
    pub fn apply<T>(self, mut values: Vec<T>) -> Vec<T> {
        match self {
            SnapshotLimit::Unlimited => values,
            SnapshotLimit::Head(count) => {
                values.truncate(count);
                values
            }
            SnapshotLimit::Tail(count) => {
                let excess = values.len().saturating_sub(count);
                values.drain(..excess);
                values
            }
        }
    }
}
