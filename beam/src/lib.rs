// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # Beam
//!
//! A concurrent runtime toolkit built around four tightly coupled pieces:
//!
//! 1. **Routines** ([`routines`]) - cooperative user-space tasks multiplexed
//!    onto a worker pool, with spawn / defer / suspend / resume semantics
//!    and a race-free two-step suspension protocol.
//! 2. **Queues & publishers** ([`queues`]) - unbounded FIFO queues whose
//!    blocking reads suspend routines rather than threads, plus
//!    multi-subscriber broadcast with optional snapshots.
//! 3. **Reactors** ([`reactors`]) - a deterministic, single-host commit
//!    graph: external inputs ring a [`Trigger`], the [`ReactorHost`]
//!    assigns monotonic sequence numbers and commits the root, and every
//!    evaluation flows to an output queue.
//! 4. **Query storage** ([`queries`]) - sequenced, indexed values behind a
//!    [`DataStore`] boundary, with write-back caches that batch writes and
//!    merge in-flight buffers into every load.
//!
//! The pieces compose: reactors commit on scheduler ticks, queues block
//! routines, publishers feed reactors, and the async store uses routines
//! and queues to decouple client writes from backend I/O.
//!
//! ## Getting started
//!
//! ```
//! use beam::{Queue, Scheduler};
//!
//! let scheduler = Scheduler::with_workers(2)?;
//! let queue = Queue::new();
//! let writer = queue.clone();
//! let producer = scheduler.spawn(async move {
//!     writer.push("hello").unwrap();
//!     writer.close();
//! });
//! let drained = scheduler.block_on(async {
//!     let mut drained = Vec::new();
//!     while let Ok(value) = queue.take().await {
//!         drained.push(value);
//!     }
//!     drained
//! });
//! assert_eq!(drained, vec!["hello"]);
//! scheduler.block_on(producer.wait())?;
//! # Ok::<(), beam::Error>(())
//! ```

pub mod error;
pub mod queries;
pub mod queues;
pub mod reactors;
pub mod routines;
pub mod threading;

pub use error::{Error, Expect};
pub use queries::{
    AsyncDataStore, BufferedDataStore, DataStore, FlushPolicy, IndexedValue, LocalDataStore,
    Query, Range, RangeBound, Sequence, SequencedIndexedValue, SequencedValue, SnapshotLimit,
    Timestamped, sequenced_indexed_value,
};
pub use queues::{CallbackQueue, Publisher, Queue, QueueWriter, SnapshotPublisher};
pub use reactors::{
    BaseReactor, BasicReactor, BasicReactorHandle, FunctionEvaluation, FunctionReactor,
    Reactor, ReactorHost, Trigger, Update, basic_reactor, constant, do_reactor,
    function_reactor, multi_reactor, publisher_reactor, queue_reactor,
};
pub use routines::{
    Async, Eval, RoutineHandler, RoutineId, RoutineState, Scheduler, SchedulerBuilder,
    SuspendedRoutines, current_routine_id, defer, suspend, suspend_staged,
};
pub use threading::{LiveTimer, Mutex, RecursiveMutex, Synchronized, TimerResult, TriggerTimer};
