//! Record shape contracts shared by the store and the facade.
//!
//! # Responsibility
//! - Describe how a record maps to one table with a single key column.
//! - Render field snapshots for diagnostics.
//!
//! # Invariants
//! - The key is always read through `Entity::key`, never discovered at runtime.

pub mod entity;
