// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Routine-aware locks: contended acquisition suspends the current routine
//! instead of parking the OS thread underneath it. See [`Mutex`] and
//! [`RecursiveMutex`].

use crate::routines::{RoutineId, SuspendedRoutines, current_routine_id, suspend_staged};
use crate::threading::lock_unpoisoned;
use std::cell::UnsafeCell;
use std::sync::Mutex as StdMutex;

#[derive(Debug, Default)]
struct LockState {
    held: bool,
    waiters: SuspendedRoutines,
}

/// A mutual-exclusion lock whose blocked acquisitions suspend routines.
///
/// The guard may be held across suspension points; other routines on the
/// same worker keep running in the meantime, which is exactly what an
/// OS-thread mutex cannot offer here.
#[derive(Debug)]
pub struct Mutex<T> {
    state: StdMutex<LockState>,
    value: UnsafeCell<T>,
}

// Exclusive access to `value` is mediated by `state.held`; the UnsafeCell is
// only ever dereferenced by the single guard holder.
unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            state: StdMutex::new(LockState::default()),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, suspending the current routine while contended.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        loop {
            {
                let mut state = lock_unpoisoned(&self.state);
                if !state.held {
                    state.held = true;
                    return MutexGuard { mutex: self };
                }
                state.waiters.stage_current();
            }
            suspend_staged().await;
        }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let mut state = lock_unpoisoned(&self.state);
        if state.held {
            None
        } else {
            state.held = true;
            Some(MutexGuard { mutex: self })
        }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

/// Scoped exclusive access to the value guarded by a [`Mutex`].
#[derive(Debug)]
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<T> std::ops::Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `state.held` grants this guard sole access until drop.
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> std::ops::DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: `state.held` grants this guard sole access until drop.
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        // Wake one live waiter per release. Handles are popped under the
        // state lock and resumed after it is released; dead handles are
        // skipped so their wakeup is not lost.
        let mut released = false;
        loop {
            let waiter = {
                let mut state = lock_unpoisoned(&self.mutex.state);
                if !released {
                    state.held = false;
                    released = true;
                }
                state.waiters.pop_front()
            };
            match waiter {
                None => return,
                Some(waiter) => {
                    if waiter.resume() {
                        return;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct RecursiveState {
    owner: Option<RoutineId>,
    depth: usize,
    waiters: SuspendedRoutines,
}

/// A routine-aware lock that the owning routine may re-acquire. Guards code
/// regions rather than data, so it carries no value.
#[derive(Debug, Default)]
pub struct RecursiveMutex {
    state: StdMutex<RecursiveState>,
}

impl RecursiveMutex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock, counting re-entries by the owning routine.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a routine; ownership is tracked by
    /// routine id.
    pub async fn lock(&self) -> RecursiveMutexGuard<'_> {
        let me = current_routine_id()
            .expect("RecursiveMutex::lock used outside of a routine; run under a Scheduler");
        loop {
            {
                let mut state = lock_unpoisoned(&self.state);
                match state.owner {
                    None => {
                        state.owner = Some(me);
                        state.depth = 1;
                        return RecursiveMutexGuard { mutex: self };
                    }
                    Some(owner) if owner == me => {
                        state.depth += 1;
                        return RecursiveMutexGuard { mutex: self };
                    }
                    Some(_) => state.waiters.stage_current(),
                }
            }
            suspend_staged().await;
        }
    }
}

/// Releases one level of a [`RecursiveMutex`] on drop.
#[derive(Debug)]
pub struct RecursiveMutexGuard<'a> {
    mutex: &'a RecursiveMutex,
}

impl Drop for RecursiveMutexGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = lock_unpoisoned(&self.mutex.state);
            state.depth -= 1;
            if state.depth > 0 {
                return;
            }
            state.owner = None;
        }
        loop {
            let waiter = {
                let mut state = lock_unpoisoned(&self.mutex.state);
                state.waiters.pop_front()
            };
            match waiter {
                None => return,
                Some(waiter) => {
                    if waiter.resume() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::Scheduler;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn lock_serializes_routines() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let total = Arc::new(Mutex::new(0_u64));
        let handlers: Vec<_> = (0..4)
            .map(|_| {
                let total = Arc::clone(&total);
                scheduler.spawn(async move {
                    for _ in 0..100 {
                        let mut guard = total.lock().await;
                        *guard += 1;
                    }
                })
            })
            .collect();
        for handler in handlers {
            scheduler.block_on(handler.wait()).unwrap();
        }
        scheduler.block_on(async {
            assert_eq!(*total.lock().await, 400);
        });
    }

    #[test]
    fn try_lock_fails_while_held() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let lock = Mutex::new(());
        scheduler.block_on(async {
            let guard = lock.lock().await;
            assert!(lock.try_lock().is_none());
            drop(guard);
            assert!(lock.try_lock().is_some());
        });
    }

    #[test]
    fn recursive_lock_reenters_for_the_owner() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let lock = Arc::new(RecursiveMutex::new());
        let lock_for_routine = Arc::clone(&lock);
        let handler = scheduler.spawn(async move {
            let outer = lock_for_routine.lock().await;
            let inner = lock_for_routine.lock().await;
            drop(inner);
            drop(outer);
        });
        scheduler.block_on(handler.wait()).unwrap();
    }
}
