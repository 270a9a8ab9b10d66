// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Bridges a publisher into the commit graph. See [`publisher_reactor`].

use super::function_reactor::{FunctionEvaluation, FunctionReactor};
use super::queue_reactor::QueueReactor;
use super::trigger::Trigger;
use crate::error::Expect;
use crate::queues::{Publisher, Queue};

/// Makes a reactor that evaluates to the values broadcast by `publisher`.
/// A fresh queue is attached as a subscriber and driven as a
/// [`QueueReactor`].
pub fn publisher_reactor<T>(publisher: &Publisher<T>, trigger: &Trigger) -> QueueReactor<T>
where
    T: Clone + Send + 'static,
{
    let subscription = Queue::new();
    publisher.monitor(subscription.clone());
    QueueReactor::new(subscription, trigger)
}

/// Like [`publisher_reactor`], but the reactor owns the publisher: the
/// publisher lives exactly as long as the node does.
pub fn owning_publisher_reactor<T>(
    publisher: Publisher<T>,
    trigger: &Trigger,
) -> FunctionReactor<T, T>
where
    T: Clone + Send + 'static,
{
    let inner = publisher_reactor(&publisher, trigger);
    FunctionReactor::new(
        move |inputs: &[Expect<T>]| {
            let _keep_alive = &publisher;
            FunctionEvaluation::of(inputs[0].clone())
        },
        vec![Box::new(inner)],
    )
}
