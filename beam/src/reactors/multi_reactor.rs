// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A reactor over a runtime vector of children whose function may decline
//! to produce a value. See [`MultiReactor`].

use super::function_reactor::{FunctionEvaluation, FunctionReactor};
use super::reactor::{BaseReactor, Reactor, Update};
use crate::error::Expect;

/// Calls a function whenever any child updates.
///
/// The generalisation of [`FunctionReactor`] for homogeneous child vectors:
/// the function sees every child's current value and returns `Some(value)`
/// to evaluate or `None` to skip this commit. Aggregation of child updates
/// follows the shared commit rules, so every child is committed at every
/// sequence the parent is.
pub struct MultiReactor<T, C> {
    inner: FunctionReactor<T, C>,
}

impl<T, C> std::fmt::Debug for MultiReactor<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiReactor").finish_non_exhaustive()
    }
}

/// Makes a [`MultiReactor`].
pub fn multi_reactor<T, C, F>(
    mut function: F,
    children: Vec<Box<dyn Reactor<C>>>,
) -> MultiReactor<T, C>
where
    F: FnMut(&[Expect<C>]) -> Option<T> + Send + 'static,
{
    MultiReactor {
        inner: FunctionReactor::new(
            move |inputs: &[Expect<C>]| FunctionEvaluation::from(function(inputs)),
            children,
        ),
    }
}

impl<T: Send, C: Send> BaseReactor for MultiReactor<T, C> {
    fn commit(&mut self, sequence: u64) -> Update {
        self.inner.commit(sequence)
    }

    fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }
}

impl<T: Clone + Send, C: Send> Reactor<T> for MultiReactor<T, C> {
    fn eval(&self) -> Expect<T> {
        self.inner.eval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactors::constant_reactor::constant;
    use pretty_assertions::assert_eq;

    #[test]
    fn evaluates_over_the_child_vector() {
        let children: Vec<Box<dyn Reactor<i32>>> = vec![
            Box::new(constant(1)),
            Box::new(constant(2)),
            Box::new(constant(3)),
        ];
        let mut node = multi_reactor(
            |inputs: &[Expect<i32>]| {
                Some(inputs.iter().filter_map(|input| input.clone().ok()).max())
            },
            children,
        );
        node.commit(0);
        assert_eq!(node.eval(), Ok(Some(3)));
        assert!(node.is_complete());
    }

    #[test]
    fn declining_produces_no_value() {
        let children: Vec<Box<dyn Reactor<i32>>> = vec![Box::new(constant(1))];
        let mut node =
            multi_reactor(|_inputs: &[Expect<i32>]| Option::<i32>::None, children);
        assert_eq!(node.commit(0), Update::None);
        assert_eq!(node.eval(), Err(crate::Error::Unavailable));
    }
}
