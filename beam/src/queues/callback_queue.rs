// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A single-consumer channel of callbacks serviced by a dedicated routine.
//! See [`CallbackQueue`].

use super::queue::Queue;
use crate::error::Expect;
use crate::routines::{RoutineHandler, Scheduler};
use std::panic::{AssertUnwindSafe, catch_unwind};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Serializes callback fan-out under one routine.
///
/// Callbacks posted from any thread run strictly in post order on a single
/// dedicated routine, so they never observe each other mid-flight. A
/// panicking callback is logged and skipped; the drain routine keeps going.
pub struct CallbackQueue {
    queue: Queue<Callback>,
    handler: RoutineHandler,
}

impl std::fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackQueue")
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl CallbackQueue {
    #[must_use]
    pub fn new(scheduler: &Scheduler) -> Self {
        let queue = Queue::<Callback>::new();
        let drain_queue = queue.clone();
        let handler = scheduler.spawn(async move {
            while let Ok(callback) = drain_queue.take().await {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                    tracing::error!(
                        message = "callback panicked; continuing to drain",
                        error = %crate::error::Error::from_panic(payload)
                    );
                }
            }
        });
        Self { queue, handler }
    }

    /// Posts a callback for execution on the drain routine.
    ///
    /// # Errors
    ///
    /// Returns the break cause if the queue has been closed.
    pub fn post(&self, callback: impl FnOnce() + Send + 'static) -> Expect<()> {
        self.queue.push(Box::new(callback))
    }

    /// Stops accepting callbacks. Already-posted callbacks still run.
    pub fn close(&self) {
        self.queue.close();
    }

    /// Suspends until the drain routine has exited (call after
    /// [`close`](Self::close)).
    pub async fn wait(&self) -> Expect<()> {
        self.handler.wait().await
    }
}
