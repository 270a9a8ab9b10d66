// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reactor graph's doorbell. See [`Trigger`].

use crate::error::Expect;
use crate::queues::Queue;

/// Signals "the graph has new input, please run a commit".
///
/// External inputs (queue pushes, [`BasicReactor::update`]) call
/// [`signal_update`]; the [`ReactorHost`] consumes one tick at a time,
/// assigns the next monotonic sequence number, and commits the root - so
/// every input gets its own deterministic commit.
///
/// [`BasicReactor::update`]: super::BasicReactor::update
/// [`ReactorHost`]: super::ReactorHost
/// [`signal_update`]: Self::signal_update
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    ticks: Queue<()>,
}

impl Trigger {
    #[must_use]
    pub fn new() -> Self {
        Self { ticks: Queue::new() }
    }

    /// Records one pending commit and wakes the host.
    pub fn signal_update(&self) {
        // Push onto a completed trigger is a shutdown no-op.
        drop(self.ticks.push(()));
    }

    /// Suspends the current routine until a tick is pending, consuming it.
    ///
    /// # Errors
    ///
    /// Returns the break cause once the trigger is completed and drained.
    pub async fn wait(&self) -> Expect<()> {
        self.ticks.take().await
    }

    /// Returns a pending tick without suspending, if one exists.
    #[must_use]
    pub fn try_wait(&self) -> bool {
        matches!(self.ticks.try_pop(), Some(Ok(())))
    }

    /// Stops the trigger; the host loop exits after draining pending ticks.
    pub fn complete(&self) {
        self.ticks.close();
    }
}
