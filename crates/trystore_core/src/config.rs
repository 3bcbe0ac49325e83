//! Session configuration.
//!
//! # Responsibility
//! - Carry connection and query-behavior knobs for `Session`.
//! - Reject unusable values before any connection is opened.
//!
//! # Invariants
//! - `stream_page_size` is always greater than zero once validated.

use crate::db::{DbError, DbResult};
use serde::{Deserialize, Serialize};

const DEFAULT_STREAM_PAGE_SIZE: u32 = 100;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Whether query results are attached to the session's change tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTracking {
    /// Loaded records are tracked and resolved through the identity map.
    #[default]
    TrackAll,
    /// Query results are returned detached. `find` still uses the identity map.
    NoTracking,
}

/// Options applied when a session opens its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub tracking: QueryTracking,
    /// Rows fetched per round trip by lazy streams.
    pub stream_page_size: u32,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tracking: QueryTracking::default(),
            stream_page_size: DEFAULT_STREAM_PAGE_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl SessionOptions {
    /// Returns a copy with query tracking disabled.
    pub fn no_tracking(mut self) -> Self {
        self.tracking = QueryTracking::NoTracking;
        self
    }

    /// # Errors
    /// - Returns `DbError::InvalidOptions` when `stream_page_size` is zero.
    pub fn validate(&self) -> DbResult<()> {
        if self.stream_page_size == 0 {
            return Err(DbError::InvalidOptions(
                "stream_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
