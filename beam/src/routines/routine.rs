// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The routine state machine. See [`RoutineState`] for the transitions and
//! the `PendingSuspend` two-step that makes suspend/resume race-free.

use super::Eval;
use crate::error::Expect;
use crate::threading::lock_unpoisoned;
use smallvec::SmallVec;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, Weak};

/// Identifies a routine. Ids are monotonic and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoutineId(u64);

impl RoutineId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RoutineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "routine-{}", self.0)
    }
}

/// The states a routine can be in.
///
/// ```text
/// Pending --(picked up)--> Running --(defer)--> Pending
/// Running --(stage)--> PendingSuspend --(suspend)--> Suspended
/// PendingSuspend --(resume)--> Running   [race path, suspend becomes a no-op]
/// Suspended --(resume)--> Pending
/// Running --(return)--> Complete         [terminal]
/// ```
///
/// `PendingSuspend` exists to close the classic wait/signal race: a producer
/// that resumes a consumer between "release the data lock" and "actually
/// suspend" observes `PendingSuspend` and merely flips the state back to
/// `Running`, so the consumer's suspend completes immediately. Collapsing the
/// two steps into a single `Suspended` state deadlocks under that race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RoutineState {
    /// Waiting in the ready queue to be run.
    Pending,
    /// Currently being polled by a worker (or by `block_on`).
    Running,
    /// Announced an imminent suspend; the guarding lock is being released.
    PendingSuspend,
    /// Parked. Requires an external resume to run again.
    Suspended,
    /// The entry future returned (or panicked). Terminal.
    Complete,
}

/// How a routine is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoutineKind {
    /// Owned by the scheduler; resume re-enqueues it onto the ready queue.
    Pooled,
    /// Runs on the caller's own OS thread via `block_on`; resume notifies
    /// the thread's parker instead.
    External,
}

pub(crate) type RoutineFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Everything the scheduler knows about one routine.
///
/// The scheduler exclusively owns live routines; every handle held elsewhere
/// is a [`Weak`] reference, so resuming a routine that has already been torn
/// down degrades to a no-op.
pub(crate) struct Routine {
    pub(crate) id: RoutineId,
    pub(crate) kind: RoutineKind,
    pub(crate) state: Mutex<RoutineState>,
    /// Wakes a parked external routine. Unused for pooled routines.
    pub(crate) unparked: Condvar,
    /// The entry future. `None` for external routines and after completion.
    pub(crate) future: Mutex<Option<RoutineFuture>>,
    pub(crate) completion: Mutex<Completion>,
    pub(crate) scheduler: Weak<super::scheduler::SchedulerShared>,
}

#[derive(Default)]
pub(crate) struct Completion {
    pub(crate) result: Option<Expect<()>>,
    pub(crate) waiters: SmallVec<[Eval<()>; 1]>,
}

impl Routine {
    pub(crate) fn pooled(
        future: RoutineFuture,
        scheduler: Weak<super::scheduler::SchedulerShared>,
    ) -> Self {
        Self {
            id: RoutineId::next(),
            kind: RoutineKind::Pooled,
            state: Mutex::new(RoutineState::Pending),
            unparked: Condvar::new(),
            future: Mutex::new(Some(future)),
            completion: Mutex::new(Completion::default()),
            scheduler,
        }
    }

    pub(crate) fn external(scheduler: Weak<super::scheduler::SchedulerShared>) -> Self {
        Self {
            id: RoutineId::next(),
            kind: RoutineKind::External,
            state: Mutex::new(RoutineState::Running),
            unparked: Condvar::new(),
            future: Mutex::new(None),
            completion: Mutex::new(Completion::default()),
            scheduler,
        }
    }

    pub(crate) fn state(&self) -> RoutineState {
        *lock_unpoisoned(&self.state)
    }

    /// Resumes this routine.
    ///
    /// - `PendingSuspend` flips back to `Running`: the routine is still on a
    ///   worker, about to suspend; that suspend now completes immediately.
    /// - `Suspended` re-enters the ready queue (pooled) or notifies the
    ///   parked thread (external).
    /// - Every other state ignores the resume.
    pub(crate) fn resume(self: std::sync::Arc<Self>) {
        let mut state = lock_unpoisoned(&self.state);
        match *state {
            RoutineState::PendingSuspend => {
                *state = RoutineState::Running;
            }
            RoutineState::Suspended => match self.kind {
                RoutineKind::Pooled => {
                    *state = RoutineState::Pending;
                    drop(state);
                    if let Some(shared) = self.scheduler.upgrade() {
                        let routine = std::sync::Arc::clone(&self);
                        shared.enqueue(routine);
                    } else {
                        tracing::trace!(
                            message = "resume after scheduler shutdown dropped",
                            id = %self.id
                        );
                    }
                }
                RoutineKind::External => {
                    *state = RoutineState::Running;
                    self.unparked.notify_all();
                }
            },
            RoutineState::Pending | RoutineState::Running | RoutineState::Complete => {}
        }
    }

    /// Attaches a completion waiter. Signals immediately if the routine has
    /// already completed.
    pub(crate) fn add_waiter(&self, waiter: Eval<()>) {
        let ready = {
            let mut completion = lock_unpoisoned(&self.completion);
            match &completion.result {
                Some(result) => Some(result.clone()),
                None => {
                    completion.waiters.push(waiter.clone());
                    None
                }
            }
        };
        if let Some(result) = ready {
            deliver(&waiter, &result);
        }
    }

    /// Marks the routine complete and signals every attached waiter. The
    /// completion lock is released before any waiter is resumed.
    pub(crate) fn complete(&self, result: Expect<()>) {
        *lock_unpoisoned(&self.future) = None;
        let waiters = {
            let mut state = lock_unpoisoned(&self.state);
            *state = RoutineState::Complete;
            let mut completion = lock_unpoisoned(&self.completion);
            completion.result = Some(result.clone());
            std::mem::take(&mut completion.waiters)
        };
        if let Err(error) = &result {
            tracing::error!(
                message = "routine terminated by panic",
                id = %self.id,
                error = %error
            );
        }
        if self.kind == RoutineKind::Pooled
            && let Some(shared) = self.scheduler.upgrade()
        {
            shared.unregister(self.id);
        }
        for waiter in waiters {
            deliver(&waiter, &result);
        }
    }
}

fn deliver(waiter: &Eval<()>, result: &Expect<()>) {
    match result {
        Ok(()) => waiter.set_result(()),
        Err(error) => waiter.set_exception(error.clone()),
    }
}

impl std::fmt::Debug for Routine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routine")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// A weak reference to a routine, suitable for wait lists. Resuming through a
/// dead handle is a no-op, mirroring "resume of a null routine is a no-op".
#[derive(Debug, Clone)]
pub struct RoutineHandle(pub(crate) Weak<Routine>);

impl RoutineHandle {
    /// Resumes the routine if it is still alive. Returns false for a dead
    /// handle, which callers that wake one waiter at a time use to move on
    /// to the next.
    pub fn resume(&self) -> bool {
        match self.0.upgrade() {
            Some(routine) => {
                routine.resume();
                true
            }
            None => false,
        }
    }
}
