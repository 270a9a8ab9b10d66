// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The load request type. See [`Query`].

use super::range::Range;
use super::snapshot_limit::SnapshotLimit;

/// What a caller asks a data store for: one index, a range over its
/// sequences and/or timestamps, and a snapshot limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<K> {
    pub index: K,
    pub range: Range,
    pub snapshot_limit: SnapshotLimit,
}

impl<K> Query<K> {
    /// A query over the whole history of `index`, unlimited.
    pub fn new(index: K) -> Self {
        Self {
            index,
            range: Range::total(),
            snapshot_limit: SnapshotLimit::Unlimited,
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn with_snapshot_limit(mut self, limit: SnapshotLimit) -> Self {
        self.snapshot_limit = limit;
        self
    }
}
