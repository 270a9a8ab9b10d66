// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! An in-memory data store. See [`LocalDataStore`].

use super::data_store::DataStore;
use super::query::Query;
use super::reservoir::Reservoir;
use super::sequence::{SequencedIndexedValue, SequencedValue, Timestamped};
use crate::error::Expect;
use crate::threading::Synchronized;
use async_trait::async_trait;
use std::hash::Hash;
use std::marker::PhantomData;

/// Keeps every stored value in per-index ordered maps. The reference
/// backend for tests and small tools, and the model the write-back caches
/// are checked against.
#[derive(Debug)]
pub struct LocalDataStore<K, V> {
    values: Synchronized<Reservoir<K, V>>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Default for LocalDataStore<K, V> {
    fn default() -> Self {
        Self {
            values: Synchronized::new(Reservoir::default()),
            _marker: PhantomData,
        }
    }
}

impl<K, V> LocalDataStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Timestamped,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.with(|reservoir| reservoir.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.with(|reservoir| reservoir.is_empty())
    }
}

#[async_trait]
impl<K, V> DataStore for LocalDataStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Timestamped + Send + Sync + 'static,
{
    type Index = K;
    type Value = V;

    async fn open(&self) -> Expect<()> {
        Ok(())
    }

    async fn close(&self) -> Expect<()> {
        Ok(())
    }

    async fn store(&self, values: Vec<SequencedIndexedValue<V, K>>) -> Expect<()> {
        self.values.with(|reservoir| reservoir.store(values));
        Ok(())
    }

    async fn load(&self, query: &Query<K>) -> Expect<Vec<SequencedValue<V>>> {
        if query.snapshot_limit.is_empty() {
            return Ok(Vec::new());
        }
        let in_range = self
            .values
            .with(|reservoir| reservoir.pending_for(&query.index, &query.range));
        Ok(query.snapshot_limit.apply(in_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sequence::{Sequence, sequenced_indexed_value};
    use crate::queries::snapshot_limit::SnapshotLimit;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(i32);

    impl Timestamped for Entry {
        fn timestamp(&self) -> chrono::DateTime<Utc> {
            Utc.timestamp_opt(0, 0).unwrap()
        }
    }

    fn store_of(entries: &[(i32, u64)]) -> LocalDataStore<String, Entry> {
        let store = LocalDataStore::new();
        store.values.with(|reservoir| {
            reservoir.store(entries.iter().map(|(value, sequence)| {
                sequenced_indexed_value(Entry(*value), "hello".to_string(), Sequence::new(*sequence))
            }));
        });
        store
    }

    #[test]
    fn load_orders_by_sequence_and_limits() {
        let scheduler = crate::routines::Scheduler::with_workers(1).unwrap();
        let store = store_of(&[(300, 7), (100, 5), (200, 6)]);
        scheduler.block_on(async {
            let query = Query::new("hello".to_string());
            let all = store.load(&query).await.unwrap();
            assert_eq!(
                all.iter().map(|entry| entry.value.0).collect::<Vec<_>>(),
                vec![100, 200, 300]
            );
            let head = store
                .load(&query.clone().with_snapshot_limit(SnapshotLimit::Head(1)))
                .await
                .unwrap();
            assert_eq!(head[0].sequence, Sequence::new(5));
            let tail = store
                .load(&query.clone().with_snapshot_limit(SnapshotLimit::Tail(2)))
                .await
                .unwrap();
            assert_eq!(
                tail.iter().map(|entry| entry.sequence.value()).collect::<Vec<_>>(),
                vec![6, 7]
            );
        });
    }
}
