// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Cooperative routines: user-space tasks multiplexed onto a worker pool.
//!
//! A [`Routine`] is spawned onto a [`Scheduler`] and runs until it hits a
//! suspension point: [`defer`], [`suspend`], a blocking queue read, an
//! [`Async::get`], or a contended routine-aware mutex. Suspension blocks the
//! routine, never the OS thread underneath it. Non-routine code enters this
//! world through [`Scheduler::block_on`], which runs the calling thread as an
//! external routine.
//!
//! [`Routine`]: routine::Routine

pub mod async_value;
pub mod routine;
pub mod routine_handler;
pub mod scheduler;
pub mod suspension;

pub use async_value::{Async, Eval};
pub use routine::{RoutineHandle, RoutineId, RoutineState};
pub use routine_handler::RoutineHandler;
pub use scheduler::{Scheduler, SchedulerBuilder, current_routine_id};
pub use suspension::{Defer, Suspend, SuspendedRoutines, defer, suspend, suspend_staged};
