//! Classification of flush failures into structured errors.
//!
//! Concurrency errors list original and attempted values per record; update
//! errors name the record type only so generic save failures never echo data.

use super::error::ResultError;
use crate::store::{EntryReport, StoreError, UpdateFault};

pub const CONCURRENCY_LABEL: &str = "Concurrency conflicts";
pub const SAVE_ERRORS_LABEL: &str = "Save errors";

/// Maps a classified flush fault to a composite error.
///
/// Returns the original error back when it is not a flush fault.
pub fn classify_save_error(err: StoreError) -> Result<ResultError, StoreError> {
    match &err {
        StoreError::Concurrency(fault) => Ok(concurrency_error(fault, ResultError::from_fault(&err))),
        StoreError::Update(fault) => Ok(update_error(fault, ResultError::from_fault(&err))),
        _ => Err(err),
    }
}

pub fn concurrency_error(fault: &UpdateFault, native: ResultError) -> ResultError {
    let mut children = fault
        .entries
        .iter()
        .map(|entry| ResultError::message(concurrency_line(entry)))
        .collect::<Vec<_>>();
    children.push(native);
    ResultError::composite(CONCURRENCY_LABEL, children)
}

pub fn update_error(fault: &UpdateFault, native: ResultError) -> ResultError {
    let mut children = fault
        .entries
        .iter()
        .map(|entry| ResultError::message(format!("Save errors for '{}'", entry.type_name)))
        .collect::<Vec<_>>();
    children.push(native);
    ResultError::composite(SAVE_ERRORS_LABEL, children)
}

fn concurrency_line(entry: &EntryReport) -> String {
    format!(
        "Concurrency conflict for '{}'. Original value : '{}'. New value : '{}'",
        entry.type_name,
        entry.render_original(),
        entry.render_current()
    )
}
