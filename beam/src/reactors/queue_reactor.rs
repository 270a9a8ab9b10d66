// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Bridges a queue into the commit graph. See [`QueueReactor`].

use super::reactor::{BaseReactor, Reactor, Update};
use super::trigger::Trigger;
use crate::error::{Error, Expect};
use crate::queues::Queue;

/// Evaluates to the values of a queue, one per commit.
///
/// The reactor installs itself as the queue's activity notifier: every push
/// and the close each signal the trigger once, so the host grants the graph
/// one commit per input. Each commit drains at most one value.
///
/// Completion follows the queue's break: a plain close terminates the node
/// leaving its last value (or `Unavailable`) in place, while a close with an
/// explicit cause makes that cause the terminal value surfaced by `eval`.
#[derive(Debug)]
pub struct QueueReactor<T> {
    queue: Queue<T>,
    value: Expect<T>,
    has_value: bool,
    complete: bool,
    current_sequence: Option<u64>,
    memo: Update,
}

/// Makes a [`QueueReactor`].
pub fn queue_reactor<T: Send + 'static>(queue: Queue<T>, trigger: &Trigger) -> QueueReactor<T> {
    QueueReactor::new(queue, trigger)
}

impl<T: Send + 'static> QueueReactor<T> {
    pub fn new(queue: Queue<T>, trigger: &Trigger) -> Self {
        let trigger = trigger.clone();
        queue.set_notifier(move || trigger.signal_update());
        Self {
            queue,
            value: Err(Error::Unavailable),
            has_value: false,
            complete: false,
            current_sequence: None,
            memo: Update::None,
        }
    }
}

impl<T: Clone + Send> BaseReactor for QueueReactor<T> {
    fn commit(&mut self, sequence: u64) -> Update {
        // Sequence 0 is a pure probe: it must never consume queue input,
        // because parents probe children before committing them at the real
        // sequence.
        if sequence == 0 {
            return if self.has_value {
                Update::Eval
            } else if self.complete {
                Update::Complete
            } else {
                Update::None
            };
        }
        if self.current_sequence == Some(sequence) {
            return self.memo;
        }
        if self.complete {
            return Update::None;
        }
        let update = match self.queue.try_pop() {
            Some(Ok(value)) => {
                self.value = Ok(value);
                self.has_value = true;
                Update::Eval
            }
            Some(Err(cause)) => {
                self.complete = true;
                if !matches!(cause, Error::PipeBroken) {
                    self.value = Err(cause);
                }
                Update::Complete
            }
            None => Update::None,
        };
        self.current_sequence = Some(sequence);
        self.memo = update;
        update
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

impl<T: Clone + Send> Reactor<T> for QueueReactor<T> {
    fn eval(&self) -> Expect<T> {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drains_one_value_per_commit() {
        let queue = Queue::new();
        let trigger = Trigger::new();
        let mut node = queue_reactor(queue.clone(), &trigger);
        queue.push(10).unwrap();
        queue.push(20).unwrap();
        // One trigger tick per push.
        assert!(trigger.try_wait());
        assert!(trigger.try_wait());
        assert!(!trigger.try_wait());

        assert_eq!(node.commit(1), Update::Eval);
        assert_eq!(node.eval(), Ok(10));
        // Idempotent at the same sequence: the second value stays queued.
        assert_eq!(node.commit(1), Update::Eval);
        assert_eq!(node.eval(), Ok(10));
        assert_eq!(node.commit(2), Update::Eval);
        assert_eq!(node.eval(), Ok(20));
        assert_eq!(node.commit(3), Update::None);
    }

    #[test]
    fn close_completes_with_last_value_intact() {
        let queue = Queue::new();
        let trigger = Trigger::new();
        let mut node = queue_reactor(queue.clone(), &trigger);
        queue.push(5).unwrap();
        queue.close();
        assert_eq!(node.commit(1), Update::Eval);
        assert_eq!(node.commit(2), Update::Complete);
        assert!(node.is_complete());
        assert_eq!(node.eval(), Ok(5));
        assert_eq!(node.commit(3), Update::None);
    }

    #[test]
    fn explicit_close_cause_becomes_terminal_value() {
        let queue = Queue::<u8>::new();
        let trigger = Trigger::new();
        let mut node = queue_reactor(queue.clone(), &trigger);
        queue.close_with(Error::Cancelled);
        assert_eq!(node.commit(1), Update::Complete);
        assert_eq!(node.eval(), Err(Error::Cancelled));
    }

    #[test]
    fn pre_existing_values_still_signal_the_trigger() {
        let queue = Queue::new();
        queue.push(1).unwrap();
        let trigger = Trigger::new();
        let _node = queue_reactor(queue.clone(), &trigger);
        assert!(trigger.try_wait());
    }
}
