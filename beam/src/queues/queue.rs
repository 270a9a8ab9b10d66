// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Unbounded FIFO queue with break semantics and routine-blocking reads.
//! See [`Queue`].

use crate::error::{Error, Expect};
use crate::routines::{SuspendedRoutines, suspend_staged};
use crate::threading::lock_unpoisoned;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A callback invoked (outside the queue lock) after every push and close.
/// Reactors use this to signal their trigger without a dedicated monitor
/// routine.
type Notifier = Arc<dyn Fn() + Send + Sync>;

struct QueueInner<T> {
    values: VecDeque<T>,
    /// The break cause. `Some` once the queue is closed; pending values
    /// still drain in FIFO order before readers observe it.
    broken: Option<Error>,
    waiters: SuspendedRoutines,
    notifier: Option<Notifier>,
}

/// The writer capability of a queue: what a [`Publisher`] holds per
/// subscriber. Object-safe so heterogeneous sinks can subscribe.
///
/// [`Publisher`]: crate::queues::Publisher
pub trait QueueWriter<T>: Send + Sync {
    /// Appends a value. Fails with the break cause once the queue is closed.
    fn push(&self, value: T) -> Expect<()>;

    /// Closes the queue with the default [`Error::PipeBroken`] cause.
    fn close(&self);

    /// Closes the queue with an explicit cause (for example
    /// [`Error::Cancelled`]).
    fn close_with(&self, cause: Error);
}

/// An unbounded multi-producer FIFO queue shared by cloning the handle.
///
/// Readers that find the queue empty suspend their routine (not the OS
/// thread) until a writer pushes or closes. After a close, remaining values
/// drain in order; once empty, reads surface the break cause.
pub struct Queue<T> {
    inner: Arc<Mutex<QueueInner<T>>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_unpoisoned(&self.inner);
        f.debug_struct("Queue")
            .field("len", &inner.values.len())
            .field("broken", &inner.broken)
            .finish_non_exhaustive()
    }
}

impl<T> Queue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                values: VecDeque::new(),
                broken: None,
                waiters: SuspendedRoutines::new(),
                notifier: None,
            })),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.inner).values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock_unpoisoned(&self.inner).values.is_empty()
    }

    /// Reports whether the queue has been closed. Values may still be
    /// pending even when this returns true.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        lock_unpoisoned(&self.inner).broken.is_some()
    }

    /// Appends a value and resumes any suspended readers.
    ///
    /// # Errors
    ///
    /// Returns the break cause if the queue has been closed.
    pub fn push(&self, value: T) -> Expect<()> {
        let (mut waiters, notifier) = {
            let mut inner = lock_unpoisoned(&self.inner);
            if let Some(cause) = &inner.broken {
                return Err(cause.clone());
            }
            inner.values.push_back(value);
            (inner.waiters.take(), inner.notifier.clone())
        };
        waiters.resume_all();
        if let Some(notifier) = notifier {
            notifier();
        }
        Ok(())
    }

    /// Blocking peek: suspends the current routine until a value is at the
    /// front, then returns a clone of it without removing it.
    ///
    /// # Errors
    ///
    /// Returns the break cause once the queue is closed and drained.
    pub async fn top(&self) -> Expect<T>
    where
        T: Clone,
    {
        loop {
            {
                let mut inner = lock_unpoisoned(&self.inner);
                if let Some(value) = inner.values.front() {
                    return Ok(value.clone());
                }
                if let Some(cause) = &inner.broken {
                    return Err(cause.clone());
                }
                inner.waiters.stage_current();
            }
            suspend_staged().await;
        }
    }

    /// Removes and returns the front value without blocking.
    ///
    /// # Errors
    ///
    /// Returns the break cause once closed and drained, or
    /// [`Error::Unavailable`] when the queue is merely empty.
    pub fn pop(&self) -> Expect<T> {
        let mut inner = lock_unpoisoned(&self.inner);
        if let Some(value) = inner.values.pop_front() {
            return Ok(value);
        }
        match &inner.broken {
            Some(cause) => Err(cause.clone()),
            None => Err(Error::Unavailable),
        }
    }

    /// Non-blocking removal for pollers: `None` when the queue is empty but
    /// still open, `Some(Err(cause))` once it is closed and drained.
    pub fn try_pop(&self) -> Option<Expect<T>> {
        let mut inner = lock_unpoisoned(&self.inner);
        if let Some(value) = inner.values.pop_front() {
            return Some(Ok(value));
        }
        inner.broken.as_ref().map(|cause| Err(cause.clone()))
    }

    /// Blocking pop: suspends the current routine until a value is
    /// available, then removes and returns it.
    ///
    /// # Errors
    ///
    /// Returns the break cause once the queue is closed and drained.
    pub async fn take(&self) -> Expect<T> {
        loop {
            {
                let mut inner = lock_unpoisoned(&self.inner);
                if let Some(value) = inner.values.pop_front() {
                    return Ok(value);
                }
                if let Some(cause) = &inner.broken {
                    return Err(cause.clone());
                }
                inner.waiters.stage_current();
            }
            suspend_staged().await;
        }
    }

    /// Closes the queue with an explicit cause, resuming suspended readers
    /// so they can drain the remainder. The first cause wins.
    pub fn close_with(&self, cause: Error) {
        let (mut waiters, notifier) = {
            let mut inner = lock_unpoisoned(&self.inner);
            if inner.broken.is_some() {
                return;
            }
            inner.broken = Some(cause);
            (inner.waiters.take(), inner.notifier.clone())
        };
        waiters.resume_all();
        if let Some(notifier) = notifier {
            notifier();
        }
    }

    /// Closes the queue with the default [`Error::PipeBroken`] cause.
    pub fn close(&self) {
        self.close_with(Error::PipeBroken);
    }

    /// Installs the activity notifier, replacing any previous one. It fires
    /// once per push and once per close, and is invoked immediately for
    /// values (and a close) that are already pending, so no activity is
    /// missed across installation.
    pub fn set_notifier(&self, notifier: impl Fn() + Send + Sync + 'static) {
        let notifier: Notifier = Arc::new(notifier);
        let backlog = {
            let mut inner = lock_unpoisoned(&self.inner);
            let backlog = inner.values.len() + usize::from(inner.broken.is_some());
            inner.notifier = Some(Arc::clone(&notifier));
            backlog
        };
        for _ in 0..backlog {
            notifier();
        }
    }
}

impl<T: Send + 'static> QueueWriter<T> for Queue<T> {
    fn push(&self, value: T) -> Expect<()> {
        Queue::push(self, value)
    }

    fn close(&self) {
        Queue::close(self);
    }

    fn close_with(&self, cause: Error) {
        Queue::close_with(self, cause);
    }
}
