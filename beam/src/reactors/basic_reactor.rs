// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A reactor that is updated programmatically. See [`BasicReactor`].

use super::queue_reactor::QueueReactor;
use super::reactor::{BaseReactor, Reactor, Update};
use super::trigger::Trigger;
use crate::error::{Error, Expect};
use crate::queues::Queue;

/// A reactor fed by explicit calls instead of an upstream node.
///
/// Semantically a [`QueueReactor`] over an internal queue: [`update`] pushes
/// a value (signalling the trigger), [`set_complete`] breaks the queue. A
/// clonable [`BasicReactorHandle`] lets producers keep updating after the
/// node itself has been handed to the graph.
///
/// [`update`]: Self::update
/// [`set_complete`]: Self::set_complete
#[derive(Debug)]
pub struct BasicReactor<T> {
    queue: Queue<T>,
    reactor: QueueReactor<T>,
}

/// The producer side of a [`BasicReactor`], detached from graph ownership.
#[derive(Debug)]
pub struct BasicReactorHandle<T> {
    queue: Queue<T>,
}

impl<T> Clone for BasicReactorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

/// Makes a [`BasicReactor`].
pub fn basic_reactor<T: Send + 'static>(trigger: &Trigger) -> BasicReactor<T> {
    BasicReactor::new(trigger)
}

impl<T: Send + 'static> BasicReactor<T> {
    pub fn new(trigger: &Trigger) -> Self {
        let queue = Queue::new();
        let reactor = QueueReactor::new(queue.clone(), trigger);
        Self { queue, reactor }
    }

    /// Returns a producer handle sharing this reactor's queue.
    #[must_use]
    pub fn handle(&self) -> BasicReactorHandle<T> {
        BasicReactorHandle {
            queue: self.queue.clone(),
        }
    }

    /// Feeds a value into the reactor. Ignored after completion.
    pub fn update(&self, value: T) {
        drop(self.queue.push(value));
    }

    /// Terminates the reactor; its value stays whatever it last was.
    pub fn set_complete(&self) {
        self.queue.close();
    }

    /// Terminates the reactor with `cause` as its terminal value.
    pub fn set_complete_with(&self, cause: Error) {
        self.queue.close_with(cause);
    }
}

impl<T: Send + 'static> BasicReactorHandle<T> {
    pub fn update(&self, value: T) {
        drop(self.queue.push(value));
    }

    pub fn set_complete(&self) {
        self.queue.close();
    }

    pub fn set_complete_with(&self, cause: Error) {
        self.queue.close_with(cause);
    }
}

impl<T: Clone + Send + 'static> BaseReactor for BasicReactor<T> {
    fn commit(&mut self, sequence: u64) -> Update {
        self.reactor.commit(sequence)
    }

    fn is_complete(&self) -> bool {
        self.reactor.is_complete()
    }
}

impl<T: Clone + Send + 'static> Reactor<T> for BasicReactor<T> {
    fn eval(&self) -> Expect<T> {
        self.reactor.eval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn updates_flow_through_commits() {
        let trigger = Trigger::new();
        let mut node = basic_reactor::<i32>(&trigger);
        let handle = node.handle();
        handle.update(11);
        assert_eq!(node.commit(1), Update::Eval);
        assert_eq!(node.eval(), Ok(11));
    }

    #[test]
    fn complete_without_update_has_no_value() {
        let trigger = Trigger::new();
        let mut node = basic_reactor::<i32>(&trigger);
        node.set_complete();
        assert_eq!(node.commit(1), Update::Complete);
        assert!(node.is_complete());
        assert_eq!(node.eval(), Err(Error::Unavailable));
    }

    #[test]
    fn complete_with_cause_surfaces_it_from_eval() {
        let trigger = Trigger::new();
        let mut node = basic_reactor::<i32>(&trigger);
        node.set_complete_with(Error::Cancelled);
        assert_eq!(node.commit(1), Update::Complete);
        assert_eq!(node.eval(), Err(Error::Cancelled));
    }
}
