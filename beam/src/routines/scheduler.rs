// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The cooperative scheduler: N routines multiplexed over M worker threads.
//! See [`Scheduler`].
//!
//! Each worker runs one routine at a time and switches only at explicit
//! suspension points ([`defer`], [`suspend`], a blocking queue read, an
//! [`Async::get`], a contended routine-aware mutex). A routine that suspends
//! is stashed in the wait list of whatever it is blocked on; a routine that
//! defers goes back to the tail of the shared ready queue. Routines may
//! migrate between workers on resume.
//!
//! There are no process-wide singletons here: the scheduler is an explicit
//! context object passed to whatever needs to spawn. Only the *current
//! routine* slot is thread-local, and it is owned by the scheduler, set
//! around each poll.
//!
//! [`defer`]: super::defer
//! [`suspend`]: super::suspend
//! [`Async::get`]: super::Async::get

use super::routine::{Routine, RoutineFuture, RoutineState};
use super::routine_handler::RoutineHandler;
use crate::error::{Error, Expect};
use crate::threading::lock_unpoisoned;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Wake, Waker};

thread_local! {
    static CURRENT_ROUTINE: RefCell<Option<Arc<Routine>>> = const { RefCell::new(None) };
}

/// Returns the routine currently executing on this thread. Well-defined only
/// inside a running routine (a spawned routine or a `block_on` body).
pub(crate) fn current_routine() -> Option<Arc<Routine>> {
    CURRENT_ROUTINE.with(|slot| slot.borrow().clone())
}

/// Returns the id of the current routine, if any. Mostly useful for logging
/// and for reentrancy checks in the routine-aware mutexes.
#[must_use]
pub fn current_routine_id() -> Option<super::RoutineId> {
    current_routine().map(|routine| routine.id)
}

/// Swaps the thread-local current-routine slot, restoring it on drop so that
/// nested `block_on` calls unwind correctly.
struct CurrentRoutineGuard {
    previous: Option<Arc<Routine>>,
}

impl CurrentRoutineGuard {
    fn enter(routine: Arc<Routine>) -> Self {
        let previous = CURRENT_ROUTINE.with(|slot| slot.borrow_mut().replace(routine));
        Self { previous }
    }
}

impl Drop for CurrentRoutineGuard {
    fn drop(&mut self) {
        CURRENT_ROUTINE.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}

/// The state shared between scheduler handles, workers, and routines.
pub(crate) struct SchedulerShared {
    ready: Mutex<VecDeque<Arc<Routine>>>,
    ready_changed: Condvar,
    shutdown: AtomicBool,
    /// Live pooled routines, by id. This registry is what keeps a suspended
    /// routine alive while it sits in wait lists: every handle held outside
    /// the scheduler is weak.
    live: Mutex<std::collections::HashMap<super::RoutineId, Arc<Routine>>>,
}

impl SchedulerShared {
    pub(crate) fn register(&self, routine: Arc<Routine>) {
        lock_unpoisoned(&self.live).insert(routine.id, routine);
    }

    pub(crate) fn unregister(&self, id: super::RoutineId) {
        lock_unpoisoned(&self.live).remove(&id);
    }

    pub(crate) fn enqueue(&self, routine: Arc<Routine>) {
        let mut ready = lock_unpoisoned(&self.ready);
        ready.push_back(routine);
        drop(ready);
        self.ready_changed.notify_one();
    }

    /// Blocks the worker (not a routine) until work arrives or shutdown.
    fn dequeue(&self) -> Option<Arc<Routine>> {
        let mut ready = lock_unpoisoned(&self.ready);
        loop {
            if let Some(routine) = ready.pop_front() {
                return Some(routine);
            }
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            ready = self
                .ready_changed
                .wait(ready)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

/// Maps the futures wake contract onto the routine state machine: waking a
/// routine is resuming it, so the `PendingSuspend` two-step covers both the
/// crate's own suspension points and any leaf future that stashes a waker.
struct RoutineWaker(Arc<Routine>);

impl Wake for RoutineWaker {
    fn wake(self: Arc<Self>) {
        Arc::clone(&self.0).resume();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        Arc::clone(&self.0).resume();
    }
}

fn waker_for(routine: &Arc<Routine>) -> Waker {
    Waker::from(Arc::new(RoutineWaker(routine.clone())))
}

struct SchedulerCore {
    shared: Arc<SchedulerShared>,
    workers: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl Drop for SchedulerCore {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.ready_changed.notify_all();
        let workers = std::mem::take(&mut *lock_unpoisoned(&self.workers));
        for worker in workers {
            drop(worker.join());
        }
    }
}

/// Configures a [`Scheduler`] before it starts. Config-as-code with sensible
/// defaults, like every other policy object in this crate.
#[derive(Debug, Clone)]
pub struct SchedulerBuilder {
    worker_count: usize,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
        }
    }
}

impl SchedulerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the number of worker threads (default: hardware
    /// parallelism). Values below 1 are clamped to 1.
    #[must_use]
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Spawns the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] if a worker thread cannot be created.
    pub fn build(self) -> Expect<Scheduler> {
        let shared = Arc::new(SchedulerShared {
            ready: Mutex::new(VecDeque::new()),
            ready_changed: Condvar::new(),
            shutdown: AtomicBool::new(false),
            live: Mutex::new(std::collections::HashMap::new()),
        });
        let mut workers = Vec::with_capacity(self.worker_count);
        for index in 0..self.worker_count {
            let shared_for_worker = Arc::clone(&shared);
            let worker = std::thread::Builder::new()
                .name(format!("beam-worker-{index}"))
                .spawn(move || worker_loop(&shared_for_worker))
                .map_err(|error| Error::ThreadSpawn(error.to_string()))?;
            workers.push(worker);
        }
        tracing::debug!(
            message = "scheduler started",
            worker_count = self.worker_count
        );
        Ok(Scheduler {
            core: Arc::new(SchedulerCore {
                shared,
                workers: Mutex::new(workers),
            }),
        })
    }
}

/// A cooperative scheduler. Cheap to clone; the worker pool shuts down when
/// the last handle drops.
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<SchedulerCore>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Builds a scheduler with one worker per hardware thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] if a worker thread cannot be created.
    pub fn new() -> Expect<Self> {
        SchedulerBuilder::default().build()
    }

    /// Builds a scheduler with an explicit worker count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] if a worker thread cannot be created.
    pub fn with_workers(count: usize) -> Expect<Self> {
        SchedulerBuilder::default().worker_count(count).build()
    }

    /// Spawns a routine in the `Pending` state at the tail of the ready
    /// queue. Scheduling is FIFO.
    ///
    /// The returned handler can `wait()` for completion; dropping it
    /// detaches the routine. An unhandled panic terminates only the routine
    /// and is delivered to every waiter as [`Error::Panicked`].
    pub fn spawn<F>(&self, future: F) -> RoutineHandler
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let boxed: RoutineFuture = Box::pin(future);
        let routine = Arc::new(Routine::pooled(
            boxed,
            Arc::downgrade(&self.core.shared),
        ));
        tracing::trace!(message = "routine spawned", id = %routine.id);
        let handler = RoutineHandler::new(&routine);
        self.core.shared.register(routine.clone());
        self.core.shared.enqueue(routine);
        handler
    }

    /// Runs `future` to completion on the calling OS thread as an *external
    /// routine*: its suspension points park this thread on a condvar and a
    /// resume notifies it. This is how non-routine code (tests, binaries)
    /// drives blocking primitives.
    ///
    /// Do not call this from inside a routine; it would pin a worker thread
    /// for the whole duration.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let routine = Arc::new(Routine::external(Arc::downgrade(&self.core.shared)));
        let _guard = CurrentRoutineGuard::enter(routine.clone());
        let waker = waker_for(&routine);
        let mut context = Context::from_waker(&waker);
        let mut future = pin!(future);
        loop {
            match future.as_mut().poll(&mut context) {
                Poll::Ready(output) => {
                    routine.complete(Ok(()));
                    return output;
                }
                Poll::Pending => {
                    let mut state = lock_unpoisoned(&routine.state);
                    loop {
                        match *state {
                            // A defer, or a resume raced in before we
                            // parked: poll again.
                            RoutineState::Running => break,
                            RoutineState::Suspended | RoutineState::PendingSuspend => {
                                state = routine
                                    .unparked
                                    .wait(state)
                                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                            }
                            RoutineState::Pending | RoutineState::Complete => break,
                        }
                    }
                }
            }
        }
    }
}

enum PollOutcome {
    Completed(Expect<()>),
    Requeue,
    Parked,
}

/// One worker: pop a pending routine, run it until it yields, decide where
/// it goes next. The poll runs inside `catch_unwind` so a panicking routine
/// terminates alone instead of taking the worker (and the scheduler) down.
fn worker_loop(shared: &Arc<SchedulerShared>) {
    while let Some(routine) = shared.dequeue() {
        {
            let mut state = lock_unpoisoned(&routine.state);
            debug_assert_eq!(*state, RoutineState::Pending);
            *state = RoutineState::Running;
        }
        let guard = CurrentRoutineGuard::enter(routine.clone());
        // The where-does-it-go-next decision happens while the future lock
        // is still held: once it is released, another worker may pick the
        // routine up, and a late requeue would run it twice.
        let outcome = {
            let mut slot = lock_unpoisoned(&routine.future);
            match slot.as_mut() {
                None => PollOutcome::Parked,
                Some(future) => {
                    let waker = waker_for(&routine);
                    let mut context = Context::from_waker(&waker);
                    match catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut context))) {
                        Ok(Poll::Ready(())) => PollOutcome::Completed(Ok(())),
                        Err(payload) => PollOutcome::Completed(Err(Error::from_panic(payload))),
                        Ok(Poll::Pending) => {
                            let mut state = lock_unpoisoned(&routine.state);
                            match *state {
                                // Suspended: ownership passed to whoever
                                // resumes it. Pending: a resume already
                                // re-enqueued it.
                                RoutineState::Suspended
                                | RoutineState::Pending
                                | RoutineState::Complete => PollOutcome::Parked,
                                // A defer (or a yield without parking):
                                // back to the tail of the ready queue.
                                RoutineState::Running | RoutineState::PendingSuspend => {
                                    *state = RoutineState::Pending;
                                    PollOutcome::Requeue
                                }
                            }
                        }
                    }
                }
            }
        };
        drop(guard);
        match outcome {
            PollOutcome::Completed(result) => {
                tracing::trace!(message = "routine completed", id = %routine.id);
                routine.complete(result);
            }
            PollOutcome::Requeue => shared.enqueue(routine),
            PollOutcome::Parked => {}
        }
    }
}
