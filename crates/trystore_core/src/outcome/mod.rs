//! Uniform success/failure values for engine calls.
//!
//! # Responsibility
//! - Turn fallible calls into `Outcome<T>` with contextualized failures.
//! - Separate "nothing matched" (`Ok(None)`) from "the call failed" (`Err`).
//!
//! # Invariants
//! - Wrapped operations run exactly once; failure messages are built lazily.
//! - Panics are never caught: programming errors stay fatal.
//! - Composite errors keep every child, including the native fault.

mod error;
mod save;

pub use error::{ErrorStructure, ResultError};
pub use save::{classify_save_error, concurrency_error, update_error, CONCURRENCY_LABEL, SAVE_ERRORS_LABEL};

use std::error::Error;

pub type Outcome<T> = Result<T, ResultError>;

/// Runs `operation` once, nesting any error under `failure_message()`.
pub fn try_execute<T, E, F, M>(operation: F, failure_message: M) -> Outcome<T>
where
    E: Error,
    F: FnOnce() -> Result<T, E>,
    M: FnOnce() -> String,
{
    operation().map_err(|err| ResultError::from_fault(&err).context(failure_message()))
}

/// Converts lenient lookups into strict ones.
pub trait OptionOutcomeExt<T> {
    /// `Ok(None)` becomes a failure carrying `message_if_absent` verbatim.
    fn collapse(self, message_if_absent: impl Into<String>) -> Outcome<T>;

    /// Like `collapse`, building the message only when it is needed.
    fn collapse_with<M: FnOnce() -> String>(self, message_if_absent: M) -> Outcome<T>;
}

impl<T> OptionOutcomeExt<T> for Outcome<Option<T>> {
    fn collapse(self, message_if_absent: impl Into<String>) -> Outcome<T> {
        self.and_then(|value| value.ok_or_else(|| ResultError::message(message_if_absent)))
    }

    fn collapse_with<M: FnOnce() -> String>(self, message_if_absent: M) -> Outcome<T> {
        self.and_then(|value| value.ok_or_else(|| ResultError::message(message_if_absent())))
    }
}
