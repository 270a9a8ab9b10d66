// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared-state and timing primitives: [`Synchronized`] scoped locking,
//! routine-aware [`Mutex`] / [`RecursiveMutex`], and the timers.

pub mod mutex;
pub mod synchronized;
pub mod timer;

pub use mutex::{Mutex, MutexGuard, RecursiveMutex, RecursiveMutexGuard};
pub use synchronized::Synchronized;
pub use timer::{LiveTimer, TimerResult, TriggerTimer, sleep};

pub(crate) use synchronized::lock_unpoisoned;
