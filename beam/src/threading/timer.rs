// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Timers. Each start cycle emits exactly one [`TimerResult`] through the
//! timer's publisher. [`TriggerTimer`] is fired by hand (deterministic
//! tests); [`LiveTimer`] expires on a dedicated wall-clock thread.

use crate::error::{Error, Expect};
use crate::queues::{Publisher, Queue};
use crate::threading::Synchronized;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// The outcome of one timer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerResult {
    /// The interval elapsed.
    Expired,
    /// [`cancel`](LiveTimer::cancel) was called before expiry. Callers treat
    /// this as the timeout-cancellation signal.
    Cancelled,
    /// The timer could not run (for example its thread failed to spawn).
    Fail,
}

/// A timer fired programmatically. Emits exactly one result per start
/// cycle: whichever of [`trigger`](Self::trigger) or
/// [`cancel`](Self::cancel) happens first.
#[derive(Debug)]
pub struct TriggerTimer {
    publisher: Publisher<TimerResult>,
    results: Queue<TimerResult>,
    armed: Synchronized<bool>,
}

impl Default for TriggerTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerTimer {
    #[must_use]
    pub fn new() -> Self {
        let publisher = Publisher::new();
        let results = Queue::new();
        publisher.monitor(results.clone());
        Self {
            publisher,
            results,
            armed: Synchronized::new(false),
        }
    }

    pub fn start(&self) {
        self.armed.with(|armed| *armed = true);
    }

    /// Fires the timer: emits [`TimerResult::Expired`] if armed.
    pub fn trigger(&self) {
        if self.disarm() {
            self.publisher.push(TimerResult::Expired);
        }
    }

    /// Cancels the cycle: emits [`TimerResult::Cancelled`] if armed.
    pub fn cancel(&self) {
        if self.disarm() {
            self.publisher.push(TimerResult::Cancelled);
        }
    }

    #[must_use]
    pub fn publisher(&self) -> &Publisher<TimerResult> {
        &self.publisher
    }

    /// Suspends the current routine until the cycle emits its result. The
    /// timer monitors its own publisher from construction, so an emission
    /// that happens before `wait` is not missed.
    pub async fn wait(&self) -> Expect<TimerResult> {
        self.results.take().await
    }

    fn disarm(&self) -> bool {
        self.armed.with(|armed| std::mem::take(armed))
    }
}

#[derive(Debug, Default)]
struct LiveTimerState {
    /// Incremented on every start; stale threads compare before emitting.
    cycle: u64,
    running: bool,
    cancelled: bool,
}

/// A wall-clock timer backed by a dedicated, named thread per cycle. The
/// thread sleeps on a condvar so [`cancel`](Self::cancel) takes effect
/// immediately rather than at the next poll.
pub struct LiveTimer {
    interval: Duration,
    publisher: Arc<Publisher<TimerResult>>,
    results: Queue<TimerResult>,
    state: Arc<(Mutex<LiveTimerState>, Condvar)>,
}

impl std::fmt::Debug for LiveTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTimer")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl LiveTimer {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let publisher = Arc::new(Publisher::new());
        let results = Queue::new();
        publisher.monitor(results.clone());
        Self {
            interval,
            publisher,
            results,
            state: Arc::new((Mutex::new(LiveTimerState::default()), Condvar::new())),
        }
    }

    /// Starts a cycle. A start while a cycle is already running is ignored.
    pub fn start(&self) {
        let cycle = {
            let (lock, _) = &*self.state;
            let mut state = crate::threading::lock_unpoisoned(lock);
            if state.running {
                return;
            }
            state.cycle += 1;
            state.running = true;
            state.cancelled = false;
            state.cycle
        };
        let interval = self.interval;
        let publisher = Arc::clone(&self.publisher);
        let state = Arc::clone(&self.state);
        let spawned = std::thread::Builder::new()
            .name(format!("beam-timer-{cycle}"))
            .spawn(move || {
                let (lock, expired_or_cancelled) = &*state;
                let mut guard = crate::threading::lock_unpoisoned(lock);
                let deadline = std::time::Instant::now() + interval;
                while !guard.cancelled && guard.cycle == cycle {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        break;
                    }
                    let (next, _) = expired_or_cancelled
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    guard = next;
                }
                let result = if guard.cancelled && guard.cycle == cycle {
                    TimerResult::Cancelled
                } else {
                    TimerResult::Expired
                };
                guard.running = false;
                drop(guard);
                publisher.push(result);
            });
        if let Err(error) = spawned {
            tracing::warn!(message = "timer thread spawn failed", error = %error);
            let (lock, _) = &*self.state;
            crate::threading::lock_unpoisoned(lock).running = false;
            self.publisher.push(TimerResult::Fail);
        }
    }

    /// Cancels the running cycle, if any; it emits
    /// [`TimerResult::Cancelled`].
    pub fn cancel(&self) {
        let (lock, expired_or_cancelled) = &*self.state;
        let mut state = crate::threading::lock_unpoisoned(lock);
        if state.running {
            state.cancelled = true;
            expired_or_cancelled.notify_all();
        }
    }

    #[must_use]
    pub fn publisher(&self) -> &Publisher<TimerResult> {
        &self.publisher
    }

    /// Suspends the current routine until the cycle emits its result. The
    /// timer monitors its own publisher from construction, so an emission
    /// that happens before `wait` is not missed.
    pub async fn wait(&self) -> Expect<TimerResult> {
        self.results.take().await
    }
}

/// Suspends the current routine for `duration`. Backed by a [`LiveTimer`];
/// the worker thread underneath stays free.
pub async fn sleep(duration: Duration) -> Expect<()> {
    let timer = LiveTimer::new(duration);
    timer.start();
    match timer.wait().await? {
        TimerResult::Expired => Ok(()),
        TimerResult::Cancelled => Err(Error::Cancelled),
        TimerResult::Fail => Err(Error::ThreadSpawn("timer thread".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::Scheduler;
    use pretty_assertions::assert_eq;

    #[test]
    fn trigger_timer_emits_exactly_once_per_cycle() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let timer = TriggerTimer::new();
        let results = Queue::new();
        timer.publisher().monitor(results.clone());
        timer.start();
        timer.trigger();
        // A cancel after the emission is ignored: the cycle is over.
        timer.cancel();
        scheduler.block_on(async {
            assert_eq!(results.take().await, Ok(TimerResult::Expired));
        });
        assert!(results.is_empty());
    }

    #[test]
    fn trigger_timer_cancel_wins_when_first() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let timer = TriggerTimer::new();
        timer.start();
        let results = Queue::new();
        timer.publisher().monitor(results.clone());
        timer.cancel();
        timer.trigger();
        scheduler.block_on(async {
            assert_eq!(results.take().await, Ok(TimerResult::Cancelled));
        });
        assert!(results.is_empty());
    }

    #[test]
    fn live_timer_expires() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let timer = LiveTimer::new(Duration::from_millis(5));
        timer.start();
        let result = scheduler.block_on(timer.wait());
        assert_eq!(result, Ok(TimerResult::Expired));
    }

    #[test]
    fn live_timer_cancel_preempts_expiry() {
        let scheduler = Scheduler::with_workers(1).unwrap();
        let timer = LiveTimer::new(Duration::from_secs(3600));
        let results = Queue::new();
        timer.publisher().monitor(results.clone());
        timer.start();
        timer.cancel();
        let result = scheduler.block_on(results.take());
        assert_eq!(result, Ok(TimerResult::Cancelled));
    }
}
