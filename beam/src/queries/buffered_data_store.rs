// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A threshold-flushed buffer in front of a backend data store. See
//! [`BufferedDataStore`].

use super::data_store::DataStore;
use super::query::Query;
use super::reservoir::{Reservoir, load_with_pending};
use super::sequence::{SequencedIndexedValue, SequencedValue};
use crate::error::Expect;
use crate::threading::Synchronized;
use std::sync::Arc;

/// The simpler write-back variant: values accumulate in one buffer until
/// `buffer_size` is reached (or [`flush`](Self::flush) is called), at which
/// point the whole buffer is stored to the backend in the calling routine.
///
/// `load` merges the buffer with backend contents exactly like
/// [`AsyncDataStore`](super::AsyncDataStore) does, so buffered values are
/// always visible.
pub struct BufferedDataStore<D: DataStore> {
    backend: Arc<D>,
    buffer: Synchronized<Reservoir<D::Index, D::Value>>,
    buffer_size: usize,
}

impl<D: DataStore> std::fmt::Debug for BufferedDataStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedDataStore")
            .field("buffer_size", &self.buffer_size)
            .field("buffered", &self.buffer.with(|buffer| buffer.len()))
            .finish_non_exhaustive()
    }
}

impl<D: DataStore> BufferedDataStore<D> {
    pub fn new(backend: impl Into<Arc<D>>, buffer_size: usize) -> Self {
        Self {
            backend: backend.into(),
            buffer: Synchronized::new(Reservoir::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    pub async fn open(&self) -> Expect<()> {
        self.backend.open().await
    }

    /// Buffers one value, flushing the whole buffer to the backend when the
    /// threshold is reached.
    pub async fn store(&self, value: SequencedIndexedValue<D::Value, D::Index>) -> Expect<()> {
        self.store_all(vec![value]).await
    }

    pub async fn store_all(
        &self,
        values: Vec<SequencedIndexedValue<D::Value, D::Index>>,
    ) -> Expect<()> {
        let over_threshold = self.buffer.with(|buffer| {
            buffer.store(values);
            buffer.len() >= self.buffer_size
        });
        if over_threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// Stores the whole buffer to the backend now. On failure the buffer is
    /// restored in front of newer writes and the error propagates.
    pub async fn flush(&self) -> Expect<()> {
        let drained = self.buffer.with(std::mem::take);
        if drained.is_empty() {
            return Ok(());
        }
        match self.backend.store(drained.to_batch()).await {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::warn!(
                    message = "buffered flush rejected by backend",
                    error = %error
                );
                self.buffer.with(|buffer| {
                    let newer = std::mem::replace(buffer, drained);
                    buffer.store(newer.to_batch());
                });
                Err(error)
            }
        }
    }

    /// Loads `query`, merging buffered values with backend contents.
    pub async fn load(
        &self,
        query: &Query<D::Index>,
    ) -> Expect<Vec<SequencedValue<D::Value>>> {
        let pending = self
            .buffer
            .with(|buffer| buffer.pending_for(&query.index, &query.range));
        load_with_pending(&*self.backend, query, pending).await
    }

    /// Flushes the remainder and closes the backend.
    pub async fn close(&self) -> Expect<()> {
        self.flush().await?;
        self.backend.close().await
    }
}
