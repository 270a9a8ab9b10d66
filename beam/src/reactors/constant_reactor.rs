// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A reactor that always holds the same value. See [`ConstantReactor`].

use super::reactor::{BaseReactor, Reactor, Update};
use crate::error::Expect;

/// Always complete, always evaluates to the same value.
///
/// A constant never *updates*: its commits report [`Update::Eval`] only at
/// the initial probe (so parents see it as initialized) and [`Update::None`]
/// afterwards.
#[derive(Debug, Clone)]
pub struct ConstantReactor<T> {
    value: T,
}

impl<T> ConstantReactor<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

/// Makes a constant reactor.
pub fn constant<T>(value: T) -> ConstantReactor<T> {
    ConstantReactor::new(value)
}

impl<T: Clone + Send> BaseReactor for ConstantReactor<T> {
    fn commit(&mut self, sequence: u64) -> Update {
        if sequence == 0 {
            Update::Eval
        } else {
            Update::None
        }
    }

    fn is_complete(&self) -> bool {
        true
    }
}

impl<T: Clone + Send> Reactor<T> for ConstantReactor<T> {
    fn eval(&self) -> Expect<T> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_is_complete_with_its_value() {
        let mut node = constant(42);
        assert_eq!(node.commit(0), Update::Eval);
        assert_eq!(node.commit(1), Update::None);
        assert_eq!(node.commit(0), Update::Eval);
        assert!(node.is_complete());
        assert_eq!(node.eval(), Ok(42));
    }
}
