// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A write-back cache in front of a backend data store. See
//! [`AsyncDataStore`].

use super::data_store::DataStore;
use super::query::Query;
use super::reservoir::{Reservoir, load_with_pending};
use super::sequence::{SequencedIndexedValue, SequencedValue};
use crate::error::Expect;
use crate::queues::Queue;
use crate::routines::{RoutineHandler, Scheduler};
use crate::threading::{Synchronized, sleep};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Retry pacing for flushes the backend rejects. Failures are never
/// dropped: the flush routine retries the same reservoir until the backend
/// accepts it.
#[derive(Debug, Clone)]
pub struct FlushPolicy {
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(1),
        }
    }
}

impl FlushPolicy {
    fn advance(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_multiplier).min(self.max_delay)
    }
}

#[derive(Debug)]
struct Buffers<K, V> {
    /// Where new writes land.
    current: Reservoir<K, V>,
    /// Rotated reservoirs awaiting backend acknowledgement, oldest first.
    flushing: VecDeque<Reservoir<K, V>>,
}

impl<K, V> Default for Buffers<K, V> {
    fn default() -> Self {
        Self {
            current: Reservoir::default(),
            flushing: VecDeque::new(),
        }
    }
}

/// Batches writes in front of a backend [`DataStore`].
///
/// `store` appends to the current reservoir and returns immediately; a
/// dedicated flush routine rotates the reservoir out and pushes it to the
/// backend, preserving per-index sequenced ordering. `load` merges the
/// in-flight reservoirs with backend contents, so readers always observe
/// exactly the set of values stored so far.
///
/// Failure semantics: an `open` failure propagates and no routine starts; a
/// `store` failure keeps the reservoir and retries per [`FlushPolicy`]
/// without blocking clients; a `load` failure surfaces to the caller with
/// the in-flight buffer untouched.
pub struct AsyncDataStore<D: DataStore> {
    backend: Arc<D>,
    scheduler: Scheduler,
    buffers: Arc<Synchronized<Buffers<D::Index, D::Value>>>,
    flush_signal: Queue<()>,
    flush_routine: Synchronized<Option<RoutineHandler>>,
    policy: FlushPolicy,
}

impl<D: DataStore + 'static> std::fmt::Debug for AsyncDataStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDataStore")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl<D: DataStore + 'static> AsyncDataStore<D> {
    pub fn new(backend: impl Into<Arc<D>>, scheduler: &Scheduler) -> Self {
        Self::with_policy(backend, scheduler, FlushPolicy::default())
    }

    pub fn with_policy(
        backend: impl Into<Arc<D>>,
        scheduler: &Scheduler,
        policy: FlushPolicy,
    ) -> Self {
        Self {
            backend: backend.into(),
            scheduler: scheduler.clone(),
            buffers: Arc::new(Synchronized::new(Buffers::default())),
            flush_signal: Queue::new(),
            flush_routine: Synchronized::new(None),
            policy,
        }
    }

    /// Opens the backend, then starts the flush routine. A backend failure
    /// propagates and leaves no routine running.
    pub async fn open(&self) -> Expect<()> {
        self.backend.open().await?;
        let backend = Arc::clone(&self.backend);
        let buffers = Arc::clone(&self.buffers);
        let signal = self.flush_signal.clone();
        let policy = self.policy.clone();
        let handler = self.scheduler.spawn(async move {
            loop {
                let tick = signal.take().await;
                flush_pending(&*backend, &buffers, &policy).await;
                if tick.is_err() {
                    break;
                }
            }
        });
        self.flush_routine.with(|slot| *slot = Some(handler));
        Ok(())
    }

    /// Queues one value for the backend and returns without any backend
    /// I/O.
    ///
    /// # Errors
    ///
    /// Fails once the store has been closed.
    pub fn store(&self, value: SequencedIndexedValue<D::Value, D::Index>) -> Expect<()> {
        self.store_all(vec![value])
    }

    /// Queues a batch. Per index, sequences must continue to strictly
    /// increase across calls.
    ///
    /// # Errors
    ///
    /// Fails once the store has been closed.
    pub fn store_all(
        &self,
        values: Vec<SequencedIndexedValue<D::Value, D::Index>>,
    ) -> Expect<()> {
        if self.flush_signal.is_broken() {
            return Err(crate::error::Error::PipeBroken);
        }
        self.buffers.with(|buffers| buffers.current.store(values));
        self.flush_signal.push(())
    }

    /// Loads `query`, observing a consistent merge of in-flight reservoirs
    /// and backend contents, in sequence order, with the snapshot limit
    /// applied after the merge.
    pub async fn load(
        &self,
        query: &Query<D::Index>,
    ) -> Expect<Vec<SequencedValue<D::Value>>> {
        let pending = self.buffers.with(|buffers| {
            let mut pending = Vec::new();
            for reservoir in &buffers.flushing {
                pending.extend(reservoir.pending_for(&query.index, &query.range));
            }
            pending.extend(buffers.current.pending_for(&query.index, &query.range));
            pending
        });
        load_with_pending(&*self.backend, query, pending).await
    }

    /// Flushes everything still buffered, stops the flush routine, and
    /// closes the backend.
    pub async fn close(&self) -> Expect<()> {
        self.flush_signal.close();
        let handler = self.flush_routine.with(Option::take);
        if let Some(handler) = handler {
            handler.wait().await?;
        }
        self.backend.close().await
    }

    /// Values accepted by `store` but not yet acknowledged by the backend.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.buffers.with(|buffers| {
            buffers.current.len()
                + buffers
                    .flushing
                    .iter()
                    .map(Reservoir::len)
                    .sum::<usize>()
        })
    }
}

impl<D: DataStore> Drop for AsyncDataStore<D> {
    fn drop(&mut self) {
        // Wakes the flush routine so it drains the remainder and exits.
        self.flush_signal.close();
    }
}

/// Rotates the current reservoir into the flushing queue and stores each
/// flushing reservoir, oldest first. A reservoir is removed only after the
/// backend acknowledges it; a failed store is retried indefinitely with
/// backoff, with the reservoir retained in front of newer writes.
async fn flush_pending<D: DataStore>(
    backend: &D,
    buffers: &Synchronized<Buffers<D::Index, D::Value>>,
    policy: &FlushPolicy,
) {
    let has_work = buffers.with(|buffers| {
        if !buffers.current.is_empty() {
            let rotated = std::mem::take(&mut buffers.current);
            buffers.flushing.push_back(rotated);
        }
        !buffers.flushing.is_empty()
    });
    if !has_work {
        return;
    }
    let mut delay = policy.initial_delay;
    loop {
        let batch = buffers.with(|buffers| buffers.flushing.front().map(Reservoir::to_batch));
        let Some(batch) = batch else {
            return;
        };
        match backend.store(batch).await {
            Ok(()) => {
                buffers.with(|buffers| {
                    buffers.flushing.pop_front();
                });
                delay = policy.initial_delay;
            }
            Err(error) => {
                tracing::warn!(
                    message = "flush rejected by backend; retrying",
                    error = %error,
                    retry_in_ms = delay.as_millis() as u64
                );
                drop(sleep(delay).await);
                delay = policy.advance(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::local_data_store::LocalDataStore;
    use crate::queries::sequence::{Sequence, Timestamped, sequenced_indexed_value};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(i32);

    impl Timestamped for Entry {
        fn timestamp(&self) -> chrono::DateTime<Utc> {
            Utc.timestamp_opt(0, 0).unwrap()
        }
    }

    #[test]
    fn buffered_values_are_visible_before_any_flush() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let backend = Arc::new(LocalDataStore::<String, Entry>::new());
        let store: AsyncDataStore<LocalDataStore<String, Entry>> =
            AsyncDataStore::new(Arc::clone(&backend), &scheduler);
        scheduler.block_on(async {
            store.open().await.unwrap();
            store
                .store(sequenced_indexed_value(
                    Entry(1),
                    "hello".to_string(),
                    Sequence::new(5),
                ))
                .unwrap();
            let loaded = store.load(&Query::new("hello".to_string())).await.unwrap();
            assert_eq!(loaded.len(), 1);
            assert_eq!(loaded[0].sequence, Sequence::new(5));
            store.close().await.unwrap();
        });
    }

    #[test]
    fn close_flushes_every_pending_value_to_the_backend() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let backend = Arc::new(LocalDataStore::<String, Entry>::new());
        let store: AsyncDataStore<LocalDataStore<String, Entry>> =
            AsyncDataStore::new(Arc::clone(&backend), &scheduler);
        scheduler.block_on(async {
            store.open().await.unwrap();
            for sequence in 5..10 {
                store
                    .store(sequenced_indexed_value(
                        Entry(i32::try_from(sequence).unwrap()),
                        "hello".to_string(),
                        Sequence::new(sequence),
                    ))
                    .unwrap();
            }
            store.close().await.unwrap();
        });
        assert_eq!(backend.len(), 5);
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn store_after_close_is_rejected() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let backend = Arc::new(LocalDataStore::<String, Entry>::new());
        let store: AsyncDataStore<LocalDataStore<String, Entry>> =
            AsyncDataStore::new(backend, &scheduler);
        scheduler.block_on(async {
            store.open().await.unwrap();
            store.close().await.unwrap();
        });
        let rejected = store.store(sequenced_indexed_value(
            Entry(1),
            "hello".to_string(),
            Sequence::new(1),
        ));
        assert!(rejected.is_err());
    }
}
