// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Crate-wide error type and the [`Expect`] alias. See [`Error`].

/// A value-or-error container. Reactor nodes carry their current result in
/// this form, and every fallible operation in the crate returns it.
pub type Expect<T> = Result<T, Error>;

/// The error kinds surfaced by the runtime core.
///
/// The type is `Clone` because a single failure may be delivered to many
/// observers at once: every routine waiting on an [`Async`], every reader of a
/// broken [`Queue`], and every downstream node of a failed reactor.
///
/// [`Async`]: crate::routines::Async
/// [`Queue`]: crate::queues::Queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum Error {
    /// A reactor has not produced a value yet.
    #[error("no value is available yet")]
    #[diagnostic(code(beam::reactors::unavailable))]
    Unavailable,

    /// A queue was drained after being broken, or a push hit a broken queue.
    #[error("pipe is broken")]
    #[diagnostic(
        code(beam::queues::pipe_broken),
        help("The queue was closed. Pending values drain in FIFO order before this surfaces.")
    )]
    PipeBroken,

    /// A timer or queue break delivered a cancellation.
    #[error("operation was cancelled")]
    #[diagnostic(code(beam::cancelled))]
    Cancelled,

    /// A connection to a collaborator could not be established.
    #[error("connect failed: {0}")]
    #[diagnostic(code(beam::io::connect))]
    Connect(String),

    /// An I/O failure surfaced from a collaborator.
    #[error("I/O failure: {0}")]
    #[diagnostic(code(beam::io::failure))]
    Io(String),

    /// A backend data store operation failed. Distinguishable from transport
    /// errors so callers can tell a bad query from a dead connection.
    #[error("data store operation failed: {0}")]
    #[diagnostic(code(beam::queries::data_store))]
    DataStore(String),

    /// A codec failed to encode or decode a value.
    #[error("serialization failed: {0}")]
    #[diagnostic(code(beam::serialization))]
    Serialization(String),

    /// A value failed a domain invariant on its type.
    #[error("type mismatch: {0}")]
    #[diagnostic(code(beam::type_mismatch))]
    TypeMismatch(String),

    /// A value fell outside its permitted domain.
    #[error("value out of range: {0}")]
    #[diagnostic(code(beam::out_of_range))]
    OutOfRange(String),

    /// A routine's entry function (or a reactor's user function) panicked.
    /// The panic terminates only that routine; waiters observe this error.
    #[error("panicked: {0}")]
    #[diagnostic(code(beam::routines::panic))]
    Panicked(String),

    /// A scheduler worker thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    #[diagnostic(
        code(beam::routines::thread_spawn),
        help("The system may have reached its thread limit - check `ulimit -u`.")
    )]
    ThreadSpawn(String),
}

impl Error {
    /// Converts a caught panic payload into [`Error::Panicked`], preserving
    /// the panic message when one was supplied.
    #[must_use]
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "panic payload was not a string".to_string()
        };
        Error::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_preserves_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom".to_string());
        assert_eq!(Error::from_panic(payload), Error::Panicked("boom".into()));
    }

    #[test]
    fn panic_payload_without_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        let Error::Panicked(message) = Error::from_panic(payload) else {
            panic!("expected a panic error");
        };
        assert!(message.contains("not a string"));
    }
}
