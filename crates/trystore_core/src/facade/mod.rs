//! Result-wrapping facade over the store.
//!
//! # Responsibility
//! - Expose every query, lookup and flush as an `Outcome`.
//! - Offer lenient (`Option`) and strict (`*_or`) variants from one implementation.
//!
//! # Invariants
//! - Failures are labelled `Failed to {operation} on '{type}'`, except
//!   classified flush faults which carry their own composite label.
//! - Facade failures are logged at `warn` with sanitized, length-capped text.

mod query_ext;
mod session_ext;

pub use query_ext::{TryQueryExt, TryStream};
pub use session_ext::TrySessionExt;

use crate::logging::loggable;
use crate::outcome::{try_execute, Outcome, ResultError};
use crate::store::StoreResult;
use log::warn;

/// Failure label used for unclassified engine errors.
pub fn failure_message(operation: &str, type_name: &str) -> String {
    format!("Failed to {operation} on '{type_name}'")
}

fn run<T>(
    operation: &'static str,
    type_name: &'static str,
    call: impl FnOnce() -> StoreResult<T>,
) -> Outcome<T> {
    let outcome = try_execute(call, || failure_message(operation, type_name));
    if let Err(err) = &outcome {
        log_failure(operation, type_name, err);
    }
    outcome
}

fn log_failure(operation: &str, type_name: &str, err: &ResultError) {
    warn!(
        "event=try_op module=facade status=error op={} entity={} error={}",
        operation,
        type_name,
        loggable(&err.error_string())
    );
}
