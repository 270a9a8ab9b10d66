// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared fixtures for the storage integration tests.

// Each test binary uses its own subset of these fixtures.
#![allow(dead_code)]

use beam::{Sequence, SequencedIndexedValue, Timestamped, sequenced_indexed_value};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// The payload used throughout the storage tests: a number plus the
/// timestamp it was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub value: i32,
    pub timestamp: DateTime<Utc>,
}

impl Entry {
    pub fn new(value: i32, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

impl Timestamped for Entry {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Hands out strictly increasing timestamps, one per call.
pub struct IncrementalTimeClient {
    now: DateTime<Utc>,
}

impl Default for IncrementalTimeClient {
    fn default() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2018, 5, 3, 0, 0, 0).unwrap(),
        }
    }
}

impl IncrementalTimeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_time(&mut self) -> DateTime<Utc> {
        let current = self.now;
        self.now += Duration::seconds(1);
        current
    }
}

/// Builds the sequenced, indexed entry the storage tests write.
pub fn entry_at(
    index: &str,
    value: i32,
    timestamp: DateTime<Utc>,
    sequence: u64,
) -> SequencedIndexedValue<Entry, String> {
    sequenced_indexed_value(
        Entry::new(value, timestamp),
        index.to_string(),
        Sequence::new(sequence),
    )
}
