// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Suspension points: [`defer`], [`suspend`], and the stage/release/park
//! two-step used by every blocking primitive in the crate. See
//! [`SuspendedRoutines`].

use super::routine::{RoutineHandle, RoutineState};
use super::scheduler::current_routine;
use crate::threading::lock_unpoisoned;
use smallvec::SmallVec;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Yields the current routine: it returns to the tail of the ready queue and
/// another pending routine runs.
pub fn defer() -> Defer {
    Defer { yielded: false }
}

/// Suspends the current routine until something resumes it. The bare form of
/// suspension; blocking primitives use [`SuspendedRoutines::stage_current`]
/// followed by [`suspend_staged`] instead, so the resume race is covered.
pub fn suspend() -> Suspend {
    Suspend {
        staged: false,
        parked: false,
    }
}

/// Completes a suspension announced via [`SuspendedRoutines::stage_current`].
/// Must be awaited *after* the guarding data lock has been released. If a
/// producer resumed the routine in between, this is a no-op.
pub fn suspend_staged() -> Suspend {
    Suspend {
        staged: true,
        parked: false,
    }
}

/// Future returned by [`defer`].
#[derive(Debug)]
pub struct Defer {
    yielded: bool,
}

impl Future for Defer {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _context: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            // The worker observes `Running` after this Pending and requeues
            // the routine at the tail; `block_on` simply polls again.
            Poll::Pending
        }
    }
}

/// Future returned by [`suspend`] and [`suspend_staged`].
#[derive(Debug)]
pub struct Suspend {
    staged: bool,
    parked: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _context: &mut Context<'_>) -> Poll<()> {
        if self.parked {
            return Poll::Ready(());
        }
        let routine = current_routine()
            .expect("suspension point used outside of a routine; run under a Scheduler");
        let mut state = lock_unpoisoned(&routine.state);
        match *state {
            // Staged two-step, but a resume raced in while the data lock was
            // being released: the suspend is a no-op.
            RoutineState::Running if self.staged => Poll::Ready(()),
            RoutineState::Running | RoutineState::PendingSuspend => {
                *state = RoutineState::Suspended;
                self.parked = true;
                Poll::Pending
            }
            RoutineState::Pending | RoutineState::Suspended | RoutineState::Complete => {
                Poll::Ready(())
            }
        }
    }
}

/// An ordered wait list of suspended routines, embedded in every blocking
/// primitive (queues, one-shot rendezvous, routine-aware mutexes).
///
/// Usage follows the two-step suspension protocol:
///
/// 1. While holding the data lock and having found nothing to consume, call
///    [`stage_current`]: the current routine transitions to `PendingSuspend`
///    and its handle joins the list.
/// 2. Release the data lock, then await [`suspend_staged`](crate::routines).
///
/// Producers take the list out (or pop one handle) while holding the data
/// lock, release the lock, and only then resume. Resuming before releasing
/// invites reentrant deadlocks.
///
/// [`stage_current`]: Self::stage_current
#[derive(Debug, Default)]
pub struct SuspendedRoutines {
    waiters: SmallVec<[RoutineHandle; 2]>,
}

impl SuspendedRoutines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Stages the current routine for suspension and records its handle.
    /// Call while holding the lock that guards the awaited condition.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a routine.
    pub fn stage_current(&mut self) {
        let routine = current_routine()
            .expect("suspension point used outside of a routine; run under a Scheduler");
        {
            let mut state = lock_unpoisoned(&routine.state);
            debug_assert_eq!(*state, RoutineState::Running);
            *state = RoutineState::PendingSuspend;
        }
        self.waiters.push(RoutineHandle(Arc::downgrade(&routine)));
    }

    /// Takes the whole list, leaving it empty. Producers use this under the
    /// data lock so resumption can happen after the lock is released.
    pub fn take(&mut self) -> SuspendedRoutines {
        SuspendedRoutines {
            waiters: std::mem::take(&mut self.waiters),
        }
    }

    /// Resumes every staged routine, in staging order.
    pub fn resume_all(&mut self) {
        for waiter in self.waiters.drain(..) {
            waiter.resume();
        }
    }

    /// Removes and returns the first staged handle. Locks that wake exactly
    /// one waiter per release pop under their data lock and resume after
    /// releasing it, so losing waiters to an early winner is impossible.
    pub fn pop_front(&mut self) -> Option<RoutineHandle> {
        if self.waiters.is_empty() {
            None
        } else {
            Some(self.waiters.remove(0))
        }
    }
}
