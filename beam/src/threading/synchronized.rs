// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Mutex-guarded state with a scoped-access API. See [`Synchronized`].

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the inner data if a previous holder panicked.
///
/// Every critical section in this crate is short and leaves its data in a
/// consistent state at all times, so a poisoned lock carries no torn state
/// worth refusing to read.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A value guarded by a mutex, accessed only through scoped closures.
///
/// The `with` pattern makes it impossible to hold the guard across a
/// suspension point: the closure runs synchronously and the lock is released
/// when it returns. Shared mutable state in this crate (publisher subscriber
/// lists, data store reservoirs, timer state) lives behind this type.
#[derive(Debug, Default)]
pub struct Synchronized<T> {
    inner: Mutex<T>,
}

impl<T> Synchronized<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Runs `operation` with exclusive access to the guarded value.
    pub fn with<R>(&self, operation: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = lock_unpoisoned(&self.inner);
        operation(&mut guard)
    }

    /// Consumes the wrapper and returns the guarded value.
    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
