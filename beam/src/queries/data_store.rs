// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The backend collaborator boundary. See [`DataStore`].

use super::query::Query;
use super::sequence::{SequencedIndexedValue, SequencedValue, Timestamped};
use crate::error::Expect;
use async_trait::async_trait;
use std::hash::Hash;

/// A persistent store of sequenced, indexed values.
///
/// The runtime core consumes this interface; concrete backends (SQL
/// bindings, remote services) live outside it. Operations suspend the
/// calling routine, never the OS thread. Errors surface verbatim as
/// [`Error::DataStore`] / [`Error::Connect`] / [`Error::Io`] kinds - the
/// write-back caches in front of this trait never swallow them.
///
/// [`Error::DataStore`]: crate::Error::DataStore
/// [`Error::Connect`]: crate::Error::Connect
/// [`Error::Io`]: crate::Error::Io
#[async_trait]
pub trait DataStore: Send + Sync {
    /// The partition key.
    type Index: Clone + Eq + Hash + Send + Sync + 'static;
    /// The stored payload.
    type Value: Timestamped + Clone + Send + Sync + 'static;

    async fn open(&self) -> Expect<()>;

    async fn close(&self) -> Expect<()>;

    /// Persists `values`. Within one call, values of the same index must
    /// arrive in strictly increasing sequence order.
    async fn store(
        &self,
        values: Vec<SequencedIndexedValue<Self::Value, Self::Index>>,
    ) -> Expect<()>;

    /// Returns the values satisfying `query`, in sequence order, with the
    /// query's snapshot limit already applied.
    async fn load(
        &self,
        query: &Query<Self::Index>,
    ) -> Expect<Vec<SequencedValue<Self::Value>>>;
}
