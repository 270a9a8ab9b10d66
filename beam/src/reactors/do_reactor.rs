// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A pass-through reactor with a side effect. See [`do_reactor`].

use super::function_reactor::{FunctionEvaluation, FunctionReactor};
use super::reactor::Reactor;
use crate::error::Expect;

/// Builds a reactor that invokes `function` for its side effect on every
/// update of `source` and passes the value through untouched. Completes iff
/// the source completes.
pub fn do_reactor<T, F, R>(mut function: F, source: R) -> FunctionReactor<T, T>
where
    T: Clone + Send + 'static,
    F: FnMut(&Expect<T>) + Send + 'static,
    R: Reactor<T> + 'static,
{
    FunctionReactor::new(
        move |inputs: &[Expect<T>]| {
            let value = &inputs[0];
            function(value);
            FunctionEvaluation::of(value.clone())
        },
        vec![Box::new(source)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactors::constant_reactor::constant;
    use crate::reactors::reactor::{BaseReactor, Update};
    use crate::threading::Synchronized;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn pass_through_with_side_effect() {
        let captured = Arc::new(Synchronized::new(None));
        let captured_for_effect = Arc::clone(&captured);
        let mut node = do_reactor(
            move |value: &Expect<i32>| {
                captured_for_effect.with(|slot| *slot = value.clone().ok());
            },
            constant(123),
        );
        // A constant source completes at the probe; no update is reported.
        assert_eq!(node.commit(0), Update::None);
        assert!(node.is_complete());
        assert_eq!(node.eval(), Ok(123));
        assert_eq!(captured.with(|slot| *slot), Some(123));
    }

    #[test]
    fn source_failures_are_observed_and_propagated() {
        let trigger = crate::reactors::Trigger::new();
        let source = crate::reactors::basic_reactor::<i32>(&trigger);
        source.set_complete_with(crate::Error::Cancelled);
        let seen = Arc::new(Synchronized::new(Vec::new()));
        let seen_for_effect = Arc::clone(&seen);
        let mut node = do_reactor(
            move |value: &Expect<i32>| {
                seen_for_effect.with(|log| log.push(value.clone()));
            },
            source,
        );
        assert_eq!(node.commit(1), Update::Complete);
        assert!(node.is_complete());
    }
}
