// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! RAII handle to a spawned routine. See [`RoutineHandler`].

use super::async_value::Async;
use super::routine::{Routine, RoutineId, RoutineState};
use crate::error::Expect;
use std::sync::{Arc, Weak};

/// A handle to a spawned routine.
///
/// Holds only a weak reference: the scheduler exclusively owns the routine
/// while it is live. Dropping the handler detaches - the routine keeps
/// running. Await [`wait`](Self::wait) to observe completion; a panicking
/// routine delivers [`Error::Panicked`](crate::Error::Panicked) here.
#[derive(Debug, Clone)]
pub struct RoutineHandler {
    id: RoutineId,
    routine: Weak<Routine>,
}

impl RoutineHandler {
    pub(crate) fn new(routine: &Arc<Routine>) -> Self {
        Self {
            id: routine.id,
            routine: Arc::downgrade(routine),
        }
    }

    #[must_use]
    pub fn id(&self) -> RoutineId {
        self.id
    }

    /// Reports the routine's current state, or `Complete` if it has already
    /// been torn down.
    #[must_use]
    pub fn state(&self) -> RoutineState {
        self.routine
            .upgrade()
            .map_or(RoutineState::Complete, |routine| routine.state())
    }

    /// Suspends the current routine until the target routine completes.
    /// Returns immediately if it already has.
    pub async fn wait(&self) -> Expect<()> {
        let Some(routine) = self.routine.upgrade() else {
            return Ok(());
        };
        let completion = Async::new();
        routine.add_waiter(completion.eval());
        completion.get().await
    }
}
