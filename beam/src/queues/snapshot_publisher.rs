// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Broadcast with an initial snapshot for late subscribers. See
//! [`SnapshotPublisher`].

use super::queue::QueueWriter;
use crate::error::Error;
use crate::threading::lock_unpoisoned;
use std::sync::{Arc, Mutex};

struct SnapshotInner<T> {
    snapshot: Option<T>,
    subscribers: Vec<Arc<dyn QueueWriter<T>>>,
}

/// A [`Publisher`](super::Publisher) that also carries the latest value.
///
/// A newly monitored queue receives the current snapshot *under the same
/// lock* that guards the subscriber list, so every subscriber observes "the
/// snapshot, then exactly the updates that followed it" - no update can
/// slip between the snapshot delivery and the subscription.
pub struct SnapshotPublisher<T> {
    inner: Mutex<SnapshotInner<T>>,
}

impl<T: Clone> Default for SnapshotPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SnapshotPublisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_unpoisoned(&self.inner);
        f.debug_struct("SnapshotPublisher")
            .field("has_snapshot", &inner.snapshot.is_some())
            .field("subscribers", &inner.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl<T: Clone> SnapshotPublisher<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SnapshotInner {
                snapshot: None,
                subscribers: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn with_snapshot(initial: T) -> Self {
        Self {
            inner: Mutex::new(SnapshotInner {
                snapshot: Some(initial),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Returns a copy of the current snapshot, if one has been published.
    #[must_use]
    pub fn snapshot(&self) -> Option<T> {
        lock_unpoisoned(&self.inner).snapshot.clone()
    }

    /// Adds a subscriber, delivering the current snapshot to it first.
    pub fn monitor(&self, writer: impl QueueWriter<T> + 'static) {
        let writer: Arc<dyn QueueWriter<T>> = Arc::new(writer);
        let mut inner = lock_unpoisoned(&self.inner);
        if let Some(snapshot) = &inner.snapshot
            && let Err(error) = writer.push(snapshot.clone())
        {
            tracing::debug!(
                message = "subscriber broken during snapshot delivery",
                error = %error
            );
            return;
        }
        inner.subscribers.push(writer);
    }

    /// Publishes `value`: it becomes the new snapshot and is broadcast to
    /// every subscriber.
    pub fn push(&self, value: T) {
        let mut inner = lock_unpoisoned(&self.inner);
        inner.snapshot = Some(value.clone());
        inner.subscribers.retain(|subscriber| {
            subscriber.push(value.clone()).is_ok()
        });
    }

    /// Closes every subscriber with `cause` and clears the set. The
    /// snapshot survives for future subscribers.
    pub fn close_with(&self, cause: Error) {
        let mut inner = lock_unpoisoned(&self.inner);
        for subscriber in inner.subscribers.drain(..) {
            subscriber.close_with(cause.clone());
        }
    }
}

impl<T> Drop for SnapshotPublisher<T> {
    fn drop(&mut self) {
        let mut inner = lock_unpoisoned(&self.inner);
        for subscriber in inner.subscribers.drain(..) {
            subscriber.close();
        }
    }
}
