// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Drives a reactor graph from trigger ticks. See [`ReactorHost`].

use super::reactor::Reactor;
use super::trigger::Trigger;
use crate::error::Expect;
use crate::queues::Queue;
use crate::routines::{RoutineHandler, Scheduler};

/// Owns a root reactor and commits it once per trigger tick.
///
/// The host routine assigns sequence numbers monotonically and finishes the
/// commit for sequence `k` before consuming the tick for `k + 1`, so the
/// output sequence is a pure function of the input observation order. Every
/// evaluation (including failure values) is published to the output queue;
/// when the root completes, the output closes and the routine exits.
#[derive(Debug)]
pub struct ReactorHost<T> {
    output: Queue<Expect<T>>,
    handler: RoutineHandler,
}

impl<T: Clone + Send + 'static> ReactorHost<T> {
    pub fn new<R>(scheduler: &Scheduler, root: R, trigger: Trigger) -> Self
    where
        R: Reactor<T> + 'static,
    {
        let output = Queue::new();
        let published = output.clone();
        let mut root = root;
        let handler = scheduler.spawn(async move {
            let mut sequence: u64 = 0;
            // Initial probe: publish a value the root already holds.
            let probe = root.commit(0);
            if probe.has_eval() {
                drop(published.push(root.eval()));
            }
            if probe.is_complete() || root.is_complete() {
                publish_terminal_failure(&published, &root, probe.has_eval());
                published.close();
                return;
            }
            while trigger.wait().await.is_ok() {
                sequence += 1;
                let update = root.commit(sequence);
                if update.has_eval() {
                    drop(published.push(root.eval()));
                }
                if update.is_complete() || root.is_complete() {
                    publish_terminal_failure(&published, &root, update.has_eval());
                    break;
                }
            }
            tracing::debug!(
                message = "reactor host finished",
                last_sequence = sequence
            );
            published.close();
        });
        Self { output, handler }
    }

    /// The stream of evaluations produced by the root, closed on
    /// completion.
    #[must_use]
    pub fn output(&self) -> Queue<Expect<T>> {
        self.output.clone()
    }

    /// Suspends until the host routine has exited.
    pub async fn wait(&self) -> Expect<()> {
        self.handler.wait().await
    }
}

/// A root that terminates holding a failure delivers it through the output
/// channel, unless that same commit already published it as an evaluation.
fn publish_terminal_failure<T, R>(output: &Queue<Expect<T>>, root: &R, already_published: bool)
where
    T: Clone + Send + 'static,
    R: Reactor<T>,
{
    if already_published {
        return;
    }
    if let Err(error) = root.eval()
        && error != crate::error::Error::Unavailable
    {
        drop(output.push(Err(error)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reactors::basic_reactor;
    use pretty_assertions::assert_eq;

    #[test]
    fn host_publishes_each_update_in_order() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let trigger = Trigger::new();
        let root = basic_reactor::<i32>(&trigger);
        let handle = root.handle();
        let host = ReactorHost::new(&scheduler, root, trigger);
        let output = host.output();
        handle.update(1);
        handle.update(2);
        handle.update(3);
        handle.set_complete();
        let collected = scheduler.block_on(async {
            let mut collected = Vec::new();
            while let Ok(value) = output.take().await {
                collected.push(value);
            }
            collected
        });
        assert_eq!(collected, vec![Ok(1), Ok(2), Ok(3)]);
        scheduler.block_on(host.wait()).unwrap();
    }

    #[test]
    fn terminal_failure_reaches_the_output() {
        let scheduler = Scheduler::with_workers(2).unwrap();
        let trigger = Trigger::new();
        let root = basic_reactor::<i32>(&trigger);
        let handle = root.handle();
        let host = ReactorHost::new(&scheduler, root, trigger);
        let output = host.output();
        handle.set_complete_with(Error::Cancelled);
        let drained = scheduler.block_on(async {
            let mut drained = Vec::new();
            while let Ok(value) = output.take().await {
                drained.push(value);
            }
            drained
        });
        assert_eq!(drained, vec![Err(Error::Cancelled)]);
        scheduler.block_on(host.wait()).unwrap();
    }
}
