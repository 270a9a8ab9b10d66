// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Multi-subscriber broadcast. See [`Publisher`].

use super::queue::QueueWriter;
use crate::error::Error;
use crate::threading::Synchronized;
use std::sync::Arc;

/// Broadcasts each pushed value to every monitored queue writer.
///
/// Subscribers are responsible for their own capacity; a subscriber whose
/// queue reports broken is evicted on the next push. Dropping the publisher
/// closes every remaining subscriber.
pub struct Publisher<T> {
    subscribers: Synchronized<Vec<Arc<dyn QueueWriter<T>>>>,
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.subscribers.with(|list| list.len()))
            .finish_non_exhaustive()
    }
}

impl<T> Publisher<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Synchronized::new(Vec::new()),
        }
    }

    /// Atomically adds a queue writer to the subscriber set. Every
    /// subsequent push is forwarded to it exactly once.
    pub fn monitor(&self, writer: impl QueueWriter<T> + 'static) {
        self.monitor_writer(Arc::new(writer));
    }

    pub fn monitor_writer(&self, writer: Arc<dyn QueueWriter<T>>) {
        self.subscribers.with(|subscribers| {
            subscribers.push(writer);
        });
    }

    /// Broadcasts `value` to every subscriber in registration order,
    /// evicting subscribers whose queues are broken.
    pub fn push(&self, value: T)
    where
        T: Clone,
    {
        self.subscribers.with(|subscribers| {
            subscribers.retain(|subscriber| match subscriber.push(value.clone()) {
                Ok(()) => true,
                Err(error) => {
                    tracing::debug!(
                        message = "evicting broken subscriber",
                        error = %error
                    );
                    false
                }
            });
        });
    }

    /// Closes every subscriber with `cause` and clears the set.
    pub fn close_with(&self, cause: Error) {
        self.subscribers.with(|subscribers| {
            for subscriber in subscribers.drain(..) {
                subscriber.close_with(cause.clone());
            }
        });
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.with(|list| list.len())
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        self.subscribers.with(|subscribers| {
            for subscriber in subscribers.drain(..) {
                subscriber.close();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queues::Queue;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_subscriber_receives_each_push_once() {
        let publisher = Publisher::new();
        let first = Queue::new();
        let second = Queue::new();
        publisher.monitor(first.clone());
        publisher.push(1);
        publisher.monitor(second.clone());
        publisher.push(2);
        assert_eq!(first.pop(), Ok(1));
        assert_eq!(first.pop(), Ok(2));
        // The late subscriber only sees pushes after it monitored.
        assert_eq!(second.pop(), Ok(2));
        assert!(second.is_empty());
    }

    #[test]
    fn broken_subscribers_are_evicted() {
        let publisher = Publisher::new();
        let subscriber = Queue::new();
        publisher.monitor(subscriber.clone());
        assert_eq!(publisher.subscriber_count(), 1);
        subscriber.close();
        publisher.push(1);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn drop_closes_subscribers() {
        let subscriber = Queue::<u8>::new();
        {
            let publisher = Publisher::new();
            publisher.monitor(subscriber.clone());
        }
        assert!(subscriber.is_broken());
    }
}
