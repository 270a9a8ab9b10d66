// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One-shot rendezvous between producers and suspended routines. See
//! [`Async`] (consumer side) and [`Eval`] (producer side).

use super::suspension::{SuspendedRoutines, suspend_staged};
use crate::error::{Error, Expect};
use crate::threading::lock_unpoisoned;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
enum Completion<T> {
    Empty,
    Value(T),
    Exception(Error),
}

#[derive(Debug)]
struct AsyncState<T> {
    inner: Mutex<AsyncInner<T>>,
}

#[derive(Debug)]
struct AsyncInner<T> {
    completion: Completion<T>,
    waiters: SuspendedRoutines,
}

/// The consumer half of a one-shot rendezvous.
///
/// [`get`](Self::get) suspends the current routine until a producer holding
/// the matching [`Eval`] completes the state with exactly one
/// [`set_result`](Eval::set_result) or [`set_exception`](Eval::set_exception).
/// After completion, every `get` returns the stored outcome without blocking.
#[derive(Debug)]
pub struct Async<T> {
    state: Arc<AsyncState<T>>,
}

/// The producer half of a one-shot rendezvous. Clonable so an operation can
/// be handed to whichever collaborator ends up completing it; still, only
/// one completion is permitted across all clones.
#[derive(Debug)]
pub struct Eval<T> {
    state: Arc<AsyncState<T>>,
}

impl<T> Clone for Eval<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for Async<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Async<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(AsyncState {
                inner: Mutex::new(AsyncInner {
                    completion: Completion::Empty,
                    waiters: SuspendedRoutines::new(),
                }),
            }),
        }
    }

    /// Returns the producer handle bound to this rendezvous.
    #[must_use]
    pub fn eval(&self) -> Eval<T> {
        Eval {
            state: Arc::clone(&self.state),
        }
    }

    /// Blocks the current routine until the rendezvous completes, then
    /// returns the stored value or exception. Idempotent after completion.
    pub async fn get(&self) -> Expect<T>
    where
        T: Clone,
    {
        loop {
            {
                let mut inner = lock_unpoisoned(&self.state.inner);
                match &inner.completion {
                    Completion::Value(value) => return Ok(value.clone()),
                    Completion::Exception(error) => return Err(error.clone()),
                    Completion::Empty => inner.waiters.stage_current(),
                }
            }
            suspend_staged().await;
        }
    }

    /// Returns the outcome if the rendezvous has completed, without blocking.
    pub fn try_get(&self) -> Option<Expect<T>>
    where
        T: Clone,
    {
        let inner = lock_unpoisoned(&self.state.inner);
        match &inner.completion {
            Completion::Value(value) => Some(Ok(value.clone())),
            Completion::Exception(error) => Some(Err(error.clone())),
            Completion::Empty => None,
        }
    }
}

impl<T> Eval<T> {
    /// Completes the rendezvous with a value and resumes every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the rendezvous was already completed.
    pub fn set_result(&self, value: T) {
        self.complete(Completion::Value(value));
    }

    /// Completes the rendezvous with an exception and resumes every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the rendezvous was already completed.
    pub fn set_exception(&self, error: Error) {
        self.complete(Completion::Exception(error));
    }

    fn complete(&self, completion: Completion<T>) {
        let mut waiters = {
            let mut inner = lock_unpoisoned(&self.state.inner);
            assert!(
                matches!(inner.completion, Completion::Empty),
                "one-shot rendezvous completed twice"
            );
            inner.completion = completion;
            inner.waiters.take()
        };
        // The state lock is released before any waiter runs again.
        waiters.resume_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::Scheduler;
    use pretty_assertions::assert_eq;

    #[test]
    fn get_after_set_does_not_block() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let rendezvous = Async::new();
        rendezvous.eval().set_result(7);
        let value = scheduler.block_on(rendezvous.get());
        assert_eq!(value, Ok(7));
        // Idempotent: a second get returns the same value.
        assert_eq!(scheduler.block_on(rendezvous.get()), Ok(7));
    }

    #[test]
    fn get_suspends_until_producer_completes() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let rendezvous = Async::<String>::new();
        let eval = rendezvous.eval();
        let producer = scheduler.spawn(async move {
            eval.set_result("ready".to_string());
        });
        let value = scheduler.block_on(rendezvous.get());
        assert_eq!(value, Ok("ready".to_string()));
        scheduler.block_on(producer.wait()).unwrap();
    }

    #[test]
    fn exception_reaches_every_waiter() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let rendezvous = Async::<u8>::new();
        rendezvous.eval().set_exception(Error::Cancelled);
        assert_eq!(scheduler.block_on(rendezvous.get()), Err(Error::Cancelled));
        assert_eq!(rendezvous.try_get(), Some(Err(Error::Cancelled)));
    }

    #[test]
    #[should_panic(expected = "completed twice")]
    fn double_completion_asserts() {
        let rendezvous = Async::new();
        rendezvous.eval().set_result(1);
        rendezvous.eval().set_result(2);
    }
}
