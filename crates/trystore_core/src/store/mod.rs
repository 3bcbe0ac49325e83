//! SQLite-backed data-access engine.
//!
//! # Responsibility
//! - Execute filtered queries, key lookups and counts for `Entity` types.
//! - Track loaded/added/updated/removed records and flush them atomically.
//! - Report flush failures as categorized faults with per-record snapshots.
//!
//! # Invariants
//! - A failed flush rolls back every write and keeps the pending change set.
//! - Update/delete writes compare every original column value (optimistic concurrency).

use crate::db::DbError;
use crate::model::entity::{render_fields, FieldSnapshot};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod query;
mod session;
mod stream;
mod tracker;

pub use query::{Comparison, Direction, Filter, Query};
pub use session::Session;
pub use stream::EntityStream;
pub use tracker::EntryState;

pub type StoreResult<T> = Result<T, StoreError>;

/// Engine error for query, lookup and flush operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// More than one row matched a single-result query.
    MultipleMatches { type_name: &'static str },
    /// Row count does not fit the narrow count type.
    CountOverflow { type_name: &'static str, count: i64 },
    /// `add` was called for a key the session already tracks.
    AlreadyTracked { type_name: &'static str, key: String },
    /// Stored rows diverged from the values last read.
    Concurrency(UpdateFault),
    /// Storage rejected the flush (constraint violations).
    Update(UpdateFault),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MultipleMatches { type_name } => {
                write!(f, "sequence of '{type_name}' contains more than one element")
            }
            Self::CountOverflow { type_name, count } => {
                write!(f, "count of '{type_name}' ({count}) exceeds the 32-bit range")
            }
            Self::AlreadyTracked { type_name, key } => {
                write!(f, "another '{type_name}' with key `{key}` is already tracked")
            }
            Self::Concurrency(fault) => write!(
                f,
                "expected each write to affect 1 row but {} write(s) affected 0 rows; \
                 data may have been modified or deleted since it was loaded",
                fault.entries.len()
            ),
            Self::Update(fault) => match &fault.source {
                Some(source) => write!(
                    f,
                    "an error occurred while saving {} entry(ies): {source}",
                    fault.entries.len()
                ),
                None => write!(
                    f,
                    "an error occurred while saving {} entry(ies)",
                    fault.entries.len()
                ),
            },
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Update(fault) => fault
                .source
                .as_ref()
                .map(|err| err as &(dyn Error + 'static)),
            Self::MultipleMatches { .. }
            | Self::CountOverflow { .. }
            | Self::AlreadyTracked { .. }
            | Self::Concurrency(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Records implicated in a failed flush.
#[derive(Debug)]
pub struct UpdateFault {
    pub entries: Vec<EntryReport>,
    /// First native storage error, when storage raised one.
    pub source: Option<rusqlite::Error>,
}

/// One implicated record with its original and attempted values.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryReport {
    pub type_name: &'static str,
    pub key: String,
    pub state: EntryState,
    /// `None` when the session never loaded the record.
    pub original: Option<FieldSnapshot>,
    pub current: FieldSnapshot,
}

impl EntryReport {
    pub fn render_original(&self) -> String {
        self.original
            .as_deref()
            .map_or_else(|| "<not loaded>".to_string(), render_fields)
    }

    pub fn render_current(&self) -> String {
        render_fields(&self.current)
    }
}
