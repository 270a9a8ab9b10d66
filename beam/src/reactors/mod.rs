// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reactor engine: a pull/push hybrid DAG of nodes that produce values
//! on numbered commit ticks.
//!
//! Nodes implement [`Reactor`]; parents own their children, so graphs are
//! acyclic by construction. External inputs arrive through queues (or
//! [`BasicReactor::update`]) and ring the [`Trigger`]; the [`ReactorHost`]
//! consumes one tick at a time, assigns the next sequence number, and
//! commits the root. Commit results are memoised per sequence, which is
//! what makes the whole graph deterministic: two runs over the same input
//! observation order produce identical output sequences.
//!
//! [`BasicReactor::update`]: BasicReactor::update

pub mod basic_reactor;
pub mod commit_reactor;
pub mod constant_reactor;
pub mod do_reactor;
pub mod function_reactor;
pub mod host;
pub mod multi_reactor;
pub mod publisher_reactor;
pub mod queue_reactor;
pub mod reactor;
pub mod trigger;

pub use basic_reactor::{BasicReactor, BasicReactorHandle, basic_reactor};
pub use commit_reactor::CommitReactor;
pub use constant_reactor::{ConstantReactor, constant};
pub use do_reactor::do_reactor;
pub use function_reactor::{FunctionEvaluation, FunctionReactor, function_reactor};
pub use host::ReactorHost;
pub use multi_reactor::{MultiReactor, multi_reactor};
pub use publisher_reactor::{owning_publisher_reactor, publisher_reactor};
pub use queue_reactor::{QueueReactor, queue_reactor};
pub use reactor::{BaseReactor, Reactor, Update};
pub use trigger::Trigger;
