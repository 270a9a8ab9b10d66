// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A scriptable data store for tests. See [`TestDataStore`].

use super::data_store::DataStore;
use super::query::Query;
use super::sequence::{SequencedIndexedValue, SequencedValue, Timestamped};
use crate::error::Expect;
use crate::queues::Publisher;
use crate::routines::{Async, Eval};
use async_trait::async_trait;
use std::hash::Hash;
use std::sync::Arc;

/// One operation submitted to a [`TestDataStore`], carrying the producer
/// handle the test completes to release the suspended caller.
#[derive(Debug)]
pub enum Operation<K, V> {
    Open(OpenOperation),
    Close(CloseOperation),
    Store(StoreOperation<K, V>),
    Load(LoadOperation<K, V>),
}

#[derive(Debug)]
pub struct OpenOperation {
    pub result: Eval<()>,
}

#[derive(Debug)]
pub struct CloseOperation {
    pub result: Eval<()>,
}

#[derive(Debug)]
pub struct StoreOperation<K, V> {
    pub values: Vec<SequencedIndexedValue<V, K>>,
    pub result: Eval<()>,
}

#[derive(Debug)]
pub struct LoadOperation<K, V> {
    pub query: Query<K>,
    pub result: Eval<Vec<SequencedValue<V>>>,
}

/// A backend whose every operation is handed to the test instead of being
/// executed.
///
/// Each call publishes an [`Operation`] on the operation publisher and
/// suspends the calling routine until the test completes the operation's
/// result - with a value to let it succeed, or with an error to script a
/// failure.
pub struct TestDataStore<K, V> {
    operations: Publisher<Arc<Operation<K, V>>>,
}

impl<K, V> Default for TestDataStore<K, V> {
    fn default() -> Self {
        Self {
            operations: Publisher::new(),
        }
    }
}

impl<K, V> std::fmt::Debug for TestDataStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestDataStore").finish_non_exhaustive()
    }
}

impl<K, V> TestDataStore<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stream of submitted operations. Monitor a queue here before
    /// driving the store.
    #[must_use]
    pub fn operation_publisher(&self) -> &Publisher<Arc<Operation<K, V>>> {
        &self.operations
    }
}

#[async_trait]
impl<K, V> DataStore for TestDataStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Timestamped + Send + Sync + 'static,
{
    type Index = K;
    type Value = V;

    async fn open(&self) -> Expect<()> {
        let outcome = Async::new();
        self.operations.push(Arc::new(Operation::Open(OpenOperation {
            result: outcome.eval(),
        })));
        outcome.get().await
    }

    async fn close(&self) -> Expect<()> {
        let outcome = Async::new();
        self.operations.push(Arc::new(Operation::Close(CloseOperation {
            result: outcome.eval(),
        })));
        outcome.get().await
    }

    async fn store(&self, values: Vec<SequencedIndexedValue<V, K>>) -> Expect<()> {
        let outcome = Async::new();
        self.operations.push(Arc::new(Operation::Store(StoreOperation {
            values,
            result: outcome.eval(),
        })));
        outcome.get().await
    }

    async fn load(&self, query: &Query<K>) -> Expect<Vec<SequencedValue<V>>> {
        let outcome = Async::new();
        self.operations.push(Arc::new(Operation::Load(LoadOperation {
            query: query.clone(),
            result: outcome.eval(),
        })));
        outcome.get().await
    }
}
