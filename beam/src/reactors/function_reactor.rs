// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A reactor that applies a function to its children's values. See
//! [`FunctionReactor`].

use super::commit_reactor::{CommitReactor, all_children_complete};
use super::reactor::{BaseReactor, Reactor, Update};
use crate::error::{Error, Expect};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// The outcome of one application of a [`FunctionReactor`]'s function.
///
/// Converts from the shapes user functions naturally return: a plain value
/// (`Eval`), an `Expect` (`Eval`, possibly carrying a failure value), or an
/// `Option` (`None` means "no update this time").
#[derive(Debug)]
pub struct FunctionEvaluation<T> {
    pub value: Option<Expect<T>>,
    pub update: Update,
}

impl<T> FunctionEvaluation<T> {
    /// No update this commit.
    #[must_use]
    pub fn none() -> Self {
        Self {
            value: None,
            update: Update::None,
        }
    }

    /// Terminate without producing a further value.
    #[must_use]
    pub fn complete() -> Self {
        Self {
            value: None,
            update: Update::Complete,
        }
    }

    /// Produce `value` as a fresh evaluation.
    #[must_use]
    pub fn of(value: Expect<T>) -> Self {
        Self {
            value: Some(value),
            update: Update::Eval,
        }
    }

    /// Produce `value` and terminate in the same commit.
    #[must_use]
    pub fn eval_complete(value: Expect<T>) -> Self {
        Self {
            value: Some(value),
            update: Update::EvalComplete,
        }
    }
}

impl<T> From<T> for FunctionEvaluation<T> {
    fn from(value: T) -> Self {
        Self::of(Ok(value))
    }
}

impl<T> From<Expect<T>> for FunctionEvaluation<T> {
    fn from(value: Expect<T>) -> Self {
        Self::of(value)
    }
}

impl<T> From<Option<T>> for FunctionEvaluation<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::of(Ok(value)),
            None => Self::none(),
        }
    }
}

type NodeFunction<T, C> = Box<dyn FnMut(&[Expect<C>]) -> FunctionEvaluation<T> + Send>;

/// Applies a function to the values of a runtime-sized set of children.
///
/// On every parent commit each child is committed at the same sequence; if
/// any reports an update, the function is applied to all child values (child
/// failures arrive as `Err` inputs rather than aborting the node). A panic
/// in the function becomes the node's current value as an `Err` with an
/// `Eval` update, so downstream operators can observe and react to it.
///
/// With no children the node evaluates once at sequence 0 and completes.
pub struct FunctionReactor<T, C> {
    function: NodeFunction<T, C>,
    children: Vec<Box<dyn Reactor<C>>>,
    commits: CommitReactor,
    value: Expect<T>,
    has_value: bool,
    complete: bool,
    current_sequence: Option<u64>,
    memo: Update,
}

impl<T, C> std::fmt::Debug for FunctionReactor<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionReactor")
            .field("children", &self.children.len())
            .field("has_value", &self.has_value)
            .field("complete", &self.complete)
            .field("current_sequence", &self.current_sequence)
            .finish_non_exhaustive()
    }
}

/// Makes a [`FunctionReactor`].
pub fn function_reactor<T, C, F>(
    function: F,
    children: Vec<Box<dyn Reactor<C>>>,
) -> FunctionReactor<T, C>
where
    F: FnMut(&[Expect<C>]) -> FunctionEvaluation<T> + Send + 'static,
{
    FunctionReactor::new(function, children)
}

impl<T, C> FunctionReactor<T, C> {
    pub fn new<F>(function: F, children: Vec<Box<dyn Reactor<C>>>) -> Self
    where
        F: FnMut(&[Expect<C>]) -> FunctionEvaluation<T> + Send + 'static,
    {
        Self {
            function: Box::new(function),
            children,
            commits: CommitReactor::new(),
            value: Err(Error::Unavailable),
            has_value: false,
            complete: false,
            current_sequence: None,
            memo: Update::None,
        }
    }

    fn apply_function(&mut self) -> Update {
        let inputs: Vec<Expect<C>> = self.children.iter().map(|child| child.eval()).collect();
        match catch_unwind(AssertUnwindSafe(|| (self.function)(&inputs))) {
            Ok(evaluation) => {
                if let Some(value) = evaluation.value {
                    self.value = value;
                }
                evaluation.update
            }
            Err(payload) => {
                // The failure becomes the node's current value; downstream
                // nodes observe it as an Err input.
                self.value = Err(Error::from_panic(payload));
                Update::Eval
            }
        }
    }
}

impl<T: Send, C: Send> BaseReactor for FunctionReactor<T, C> {
    fn commit(&mut self, sequence: u64) -> Update {
        // The probe outranks memoisation: once this node has committed at
        // all, sequence 0 reports its cached state, so a parent's
        // initialization pass can discover an already-evaluated child.
        if sequence == 0 && self.current_sequence.is_some() {
            return if self.has_value {
                Update::Eval
            } else {
                Update::Complete
            };
        }
        if self.current_sequence == Some(sequence) {
            return self.memo;
        }
        if self.complete {
            return Update::None;
        }
        let aggregate = if self.children.is_empty() {
            if sequence == 0 {
                Update::Eval
            } else {
                Update::None
            }
        } else {
            self.commits.commit(sequence, &mut self.children)
        };
        if aggregate == Update::None {
            return Update::None;
        }
        let mut result = aggregate;
        if aggregate.has_eval() {
            let produced = self.apply_function();
            if all_children_complete(&self.children) {
                self.complete = true;
            }
            match produced {
                Update::None => {
                    result = if self.children.is_empty() {
                        Update::Complete
                    } else {
                        Update::None
                    };
                }
                Update::Eval => self.has_value = true,
                Update::Complete => {
                    self.complete = true;
                    result = Update::Complete;
                }
                Update::EvalComplete => {
                    self.has_value = true;
                    self.complete = true;
                    result = Update::EvalComplete;
                }
            }
            if self.children.is_empty() {
                self.complete = true;
            }
        } else if aggregate == Update::Complete {
            if all_children_complete(&self.children) {
                self.complete = true;
            } else {
                result = Update::None;
            }
        }
        // A fresh composite node evaluates eagerly at the probe but reports
        // no update: sequence 0 is not a real tick.
        if sequence == 0 && !self.children.is_empty() && result.has_eval() {
            result = Update::None;
        }
        self.current_sequence = Some(sequence);
        self.memo = result;
        result
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

impl<T: Clone + Send, C: Send> Reactor<T> for FunctionReactor<T, C> {
    fn eval(&self) -> Expect<T> {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactors::constant_reactor::constant;
    use pretty_assertions::assert_eq;

    fn boxed<T: Clone + Send + 'static>(value: T) -> Box<dyn Reactor<T>> {
        Box::new(constant(value))
    }

    #[test]
    fn applies_function_to_child_values() {
        let mut sum = function_reactor(
            |inputs: &[Expect<i32>]| {
                let total: i32 = inputs.iter().map(|input| input.clone().unwrap()).sum();
                FunctionEvaluation::from(total)
            },
            vec![boxed(2), boxed(40)],
        );
        assert_eq!(sum.commit(0), Update::None);
        assert_eq!(sum.eval(), Ok(42));
        assert!(sum.is_complete());
        // A later probe reports the cached value.
        assert_eq!(sum.commit(0), Update::Eval);
    }

    #[test]
    fn zero_child_reactor_evaluates_once_and_completes() {
        let mut node = function_reactor(
            |_inputs: &[Expect<()>]| FunctionEvaluation::from(7),
            Vec::new(),
        );
        assert_eq!(node.commit(0), Update::Eval);
        assert!(node.is_complete());
        assert_eq!(node.eval(), Ok(7));
        assert_eq!(node.commit(1), Update::None);
    }

    #[test]
    fn function_panic_becomes_an_err_evaluation() {
        let mut node = function_reactor(
            |_inputs: &[Expect<i32>]| -> FunctionEvaluation<i32> { panic!("bad function") },
            vec![boxed(1)],
        );
        node.commit(0);
        assert_eq!(node.eval(), Err(Error::Panicked("bad function".into())));
    }

    #[test]
    fn optional_results_map_to_none_updates() {
        let mut node = function_reactor(
            |_inputs: &[Expect<i32>]| FunctionEvaluation::<i32>::from(Option::<i32>::None),
            vec![boxed(5)],
        );
        assert_eq!(node.commit(0), Update::None);
        assert_eq!(node.eval(), Err(Error::Unavailable));
        assert!(node.is_complete());
    }
}
