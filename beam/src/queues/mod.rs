// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Queue primitives built on the routine scheduler: the unbounded FIFO
//! [`Queue`], the task-dispatch [`CallbackQueue`], and the broadcast
//! [`Publisher`] / [`SnapshotPublisher`] pair.

pub mod callback_queue;
pub mod publisher;
pub mod queue;
pub mod snapshot_publisher;

pub use callback_queue::CallbackQueue;
pub use publisher::Publisher;
pub use queue::{Queue, QueueWriter};
pub use snapshot_publisher::SnapshotPublisher;
