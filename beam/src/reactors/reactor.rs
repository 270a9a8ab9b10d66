// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reactor node contract. See [`BaseReactor`] and [`Reactor`].

use crate::error::Expect;

/// What a commit produced at one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Update {
    /// Nothing changed at this sequence.
    None,
    /// A new value is available through `eval()`.
    Eval,
    /// The node has no further values; subsequent commits return `None`.
    Complete,
    /// The terminal value itself is the new evaluation.
    EvalComplete,
}

impl Update {
    /// True when this update carries a fresh evaluation.
    #[must_use]
    pub fn has_eval(self) -> bool {
        matches!(self, Update::Eval | Update::EvalComplete)
    }

    /// True when this update terminates the node.
    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, Update::Complete | Update::EvalComplete)
    }
}

/// The type-erased capability every reactor node offers, independent of its
/// value type. This is the seam that lets parents hold heterogeneous
/// children.
///
/// Contract of [`commit`](Self::commit) for a sequence number `n`:
///
/// - Committing the same `n` twice returns the same update and does not
///   advance internal state beyond `n` (memoised).
/// - After a terminal update, further commits return [`Update::None`].
/// - Sequence `0` is the initial probe: a node that has already committed
///   reports [`Update::Eval`] if it holds a cached value and
///   [`Update::Complete`] otherwise.
pub trait BaseReactor: Send {
    /// Computes this node's update at `sequence`, committing children first.
    fn commit(&mut self, sequence: u64) -> Update;

    /// True once the node has reported a terminal update.
    fn is_complete(&self) -> bool;
}

/// A reactor node producing values of type `T`.
pub trait Reactor<T>: BaseReactor {
    /// Returns the current value, [`Error::Unavailable`] before the first
    /// evaluation, or the captured failure if the node holds one.
    ///
    /// [`Error::Unavailable`]: crate::Error::Unavailable
    fn eval(&self) -> Expect<T>;
}
