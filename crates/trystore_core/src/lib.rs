//! Uniform, fallible-by-value data access over SQLite.
//!
//! Every query, key lookup and flush is exposed through [`facade`] as an
//! [`Outcome`]: `Ok(value)`, `Ok(None)` for "nothing matched" where that is
//! meaningful, or a structured [`ResultError`].

pub mod config;
pub mod db;
pub mod facade;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod store;

pub use config::{QueryTracking, SessionOptions};
pub use db::{DbError, DbResult, Migration};
pub use facade::{TryQueryExt, TrySessionExt, TryStream};
pub use logging::{init_logging, logging_status, LoggingError};
pub use model::entity::{Affinity, Entity, FieldSnapshot, KeyValue};
pub use outcome::{try_execute, ErrorStructure, OptionOutcomeExt, Outcome, ResultError};
pub use store::{
    Comparison, Direction, EntityStream, EntryReport, EntryState, Filter, Query, Session,
    StoreError, StoreResult, UpdateFault,
};

/// Minimal health-check API for linkage probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the library version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
