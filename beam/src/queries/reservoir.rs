// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! In-memory buckets of pending sequenced writes, and the buffer-aware load
//! algorithm shared by the write-back stores. See [`Reservoir`] and
//! [`load_with_pending`].

use super::data_store::DataStore;
use super::query::Query;
use super::range::RangeBound;
use super::sequence::{
    Sequence, SequencedIndexedValue, SequencedValue, Timestamped, sequenced_indexed_value,
};
use super::snapshot_limit::SnapshotLimit;
use crate::error::Expect;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A bucket of pending sequenced values awaiting backend acknowledgement,
/// ordered per index.
#[derive(Debug)]
pub(crate) struct Reservoir<K, V> {
    entries: HashMap<K, BTreeMap<Sequence, V>>,
    len: usize,
}

impl<K, V> Default for Reservoir<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            len: 0,
        }
    }
}

impl<K: Clone + Eq + Hash, V: Clone> Reservoir<K, V> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Appends `values`. Within one index, sequences must be strictly
    /// increasing across the whole store history; storing an already-present
    /// sequence is a caller bug.
    pub(crate) fn store(
        &mut self,
        values: impl IntoIterator<Item = SequencedIndexedValue<V, K>>,
    ) {
        for entry in values {
            let bucket = self.entries.entry(entry.value.index).or_default();
            let previous = bucket.insert(entry.sequence, entry.value.value);
            debug_assert!(previous.is_none(), "duplicate sequence stored in reservoir");
            if previous.is_none() {
                self.len += 1;
            }
        }
    }

    /// Copies every pending value, per-index in sequence order, for a
    /// backend store call. The reservoir keeps its contents until the
    /// backend acknowledges.
    pub(crate) fn to_batch(&self) -> Vec<SequencedIndexedValue<V, K>> {
        let mut batch = Vec::with_capacity(self.len);
        for (index, bucket) in &self.entries {
            for (sequence, value) in bucket {
                batch.push(sequenced_indexed_value(
                    value.clone(),
                    index.clone(),
                    *sequence,
                ));
            }
        }
        batch
    }

    /// The pending values of one index that fall inside `range`, in
    /// sequence order.
    pub(crate) fn pending_for(
        &self,
        index: &K,
        range: &super::range::Range,
    ) -> Vec<SequencedValue<V>>
    where
        V: Timestamped,
    {
        let Some(bucket) = self.entries.get(index) else {
            return Vec::new();
        };
        bucket
            .iter()
            .filter(|(sequence, value)| range.contains(**sequence, *value))
            .map(|(sequence, value)| SequencedValue::new(value.clone(), *sequence))
            .collect()
    }
}

/// Loads `query` from the backend while merging `pending` in-flight values.
///
/// The merge is well-defined because the reservoirs and the backend together
/// cover every stored value with no duplicates and no gaps per index: a
/// pending sequence is either beyond everything the backend holds, or a
/// flush-in-progress duplicate of a backend value (which deduplication
/// collapses).
///
/// For `Head(n)` / `Tail(n)` the backend may return fewer trustworthy values
/// than requested - its batch stops at a *frontier* sequence, and merged
/// entries beyond the frontier cannot be assumed contiguous with it. The
/// loop re-issues the backend load with the range expanded away from the
/// buffer until the trusted region satisfies `n` or both backend and buffer
/// are exhausted. The snapshot limit is applied after merging.
pub(crate) async fn load_with_pending<D>(
    backend: &D,
    query: &Query<D::Index>,
    pending: Vec<SequencedValue<D::Value>>,
) -> Expect<Vec<SequencedValue<D::Value>>>
where
    D: DataStore + ?Sized,
{
    if query.snapshot_limit.is_empty() {
        return Ok(Vec::new());
    }
    let mut merged: BTreeMap<Sequence, D::Value> = BTreeMap::new();
    for entry in pending {
        if query.range.contains(entry.sequence, &entry.value) {
            merged.insert(entry.sequence, entry.value);
        }
    }
    match query.snapshot_limit {
        SnapshotLimit::Unlimited => {
            let batch = backend.load(query).await?;
            merge_batch(&mut merged, batch, query);
        }
        SnapshotLimit::Head(count) => {
            let mut subquery = query.clone();
            loop {
                let batch = backend.load(&subquery).await?;
                let exhausted = batch.len() < count;
                let frontier = batch.last().map(|entry| entry.sequence);
                merge_batch(&mut merged, batch, query);
                if exhausted {
                    break;
                }
                let Some(frontier) = frontier else {
                    break;
                };
                let trusted = merged.range(..=frontier).count();
                if trusted >= count {
                    break;
                }
                subquery.range.begin = RangeBound::At(frontier.next());
            }
        }
        SnapshotLimit::Tail(count) => {
            let mut subquery = query.clone();
            loop {
                let batch = backend.load(&subquery).await?;
                let exhausted = batch.len() < count;
                let frontier = batch.first().map(|entry| entry.sequence);
                merge_batch(&mut merged, batch, query);
                if exhausted {
                    break;
                }
                let Some(frontier) = frontier else {
                    break;
                };
                let trusted = merged.range(frontier..).count();
                if trusted >= count {
                    break;
                }
                let Some(previous) = frontier.previous() else {
                    break;
                };
                subquery.range.end = RangeBound::At(previous);
            }
        }
    }
    let ordered: Vec<SequencedValue<D::Value>> = merged
        .into_iter()
        .map(|(sequence, value)| SequencedValue::new(value, sequence))
        .collect();
    Ok(query.snapshot_limit.apply(ordered))
}

fn merge_batch<K, V: Timestamped>(
    merged: &mut BTreeMap<Sequence, V>,
    batch: Vec<SequencedValue<V>>,
    query: &Query<K>,
) {
    for entry in batch {
        // Narrowed subqueries replace the original bounds; re-check against
        // the caller's range so no out-of-range value slips in.
        if query.range.contains(entry.sequence, &entry.value) {
            merged.insert(entry.sequence, entry.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::range::Range;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(i32);

    impl Timestamped for Entry {
        fn timestamp(&self) -> chrono::DateTime<Utc> {
            Utc.timestamp_opt(i64::from(self.0), 0).unwrap()
        }
    }

    #[test]
    fn reservoir_keeps_per_index_order() {
        let mut reservoir = Reservoir::new();
        reservoir.store(vec![
            sequenced_indexed_value(Entry(2), "a", Sequence::new(7)),
            sequenced_indexed_value(Entry(1), "a", Sequence::new(5)),
            sequenced_indexed_value(Entry(3), "b", Sequence::new(1)),
        ]);
        assert_eq!(reservoir.len(), 3);
        let pending = reservoir.pending_for(&"a", &Range::total());
        assert_eq!(
            pending,
            vec![
                SequencedValue::new(Entry(1), Sequence::new(5)),
                SequencedValue::new(Entry(2), Sequence::new(7)),
            ]
        );
    }

    #[test]
    fn pending_for_respects_the_range() {
        let mut reservoir = Reservoir::new();
        reservoir.store(vec![
            sequenced_indexed_value(Entry(1), "a", Sequence::new(5)),
            sequenced_indexed_value(Entry(2), "a", Sequence::new(6)),
            sequenced_indexed_value(Entry(3), "a", Sequence::new(7)),
        ]);
        let range = Range::between(Sequence::new(6), Sequence::new(6));
        let pending = reservoir.pending_for(&"a", &range);
        assert_eq!(pending, vec![SequencedValue::new(Entry(2), Sequence::new(6))]);
    }
}
