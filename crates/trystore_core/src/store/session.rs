//! Unit-of-work session over one SQLite connection.
//!
//! # Responsibility
//! - Own the connection, the identity map and the pending change set.
//! - Flush pending changes in a single transaction and categorize failures.
//!
//! # Invariants
//! - A session is used from one thread at a time (`Send`, not `Sync`).
//! - Key lookups consult the identity map before storage.
//! - A failed flush leaves storage and the pending change set untouched.

use super::query::{ident, Filter, Query};
use super::tracker::{ChangeTracker, PendingWrite, WriteKind};
use super::{EntryState, StoreError, StoreResult, UpdateFault};
use crate::config::{QueryTracking, SessionOptions};
use crate::db::{open_db, open_db_in_memory, Migration};
use crate::model::entity::{Affinity, Entity, KeyValue};
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, InterruptHandle, Transaction};
use std::cell::RefCell;
use std::path::Path;
use std::time::Instant;

pub struct Session {
    conn: Connection,
    options: SessionOptions,
    tracker: RefCell<ChangeTracker>,
}

impl Session {
    /// Opens a file-backed session and applies `migrations`.
    pub fn open(
        path: impl AsRef<Path>,
        options: SessionOptions,
        migrations: &[Migration],
    ) -> StoreResult<Self> {
        let conn = open_db(path, &options, migrations)?;
        Ok(Self::from_connection(conn, options))
    }

    /// Opens an in-memory session and applies `migrations`.
    pub fn open_in_memory(options: SessionOptions, migrations: &[Migration]) -> StoreResult<Self> {
        let conn = open_db_in_memory(&options, migrations)?;
        Ok(Self::from_connection(conn, options))
    }

    fn from_connection(conn: Connection, options: SessionOptions) -> Self {
        Self {
            conn,
            options,
            tracker: RefCell::new(ChangeTracker::default()),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Raw connection access for statements outside the change tracker.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Handle that aborts the statement currently running on this session.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    pub fn query<E: Entity>(&self) -> Query<'_, E> {
        Query::new(self)
    }

    /// Finds one record by key, returning a tracked instance without a
    /// storage round trip when the identity map already holds it.
    ///
    /// Found records are always tracked, regardless of `QueryTracking`.
    /// Records marked for deletion are reported as absent.
    pub fn find<E: Entity>(&self, key: &E::Key) -> StoreResult<Option<E>> {
        if let Some(tracked) = self.tracker.borrow().get::<E>(key) {
            debug!(
                "event=find module=store status=ok source=identity_map entity={}",
                E::TYPE_NAME
            );
            return Ok(Some(tracked));
        }
        if self.entry_state::<E>(key) == Some(EntryState::Deleted) {
            return Ok(None);
        }

        let (sql, binds) = Query::<E>::new(self)
            .filter(Filter::key::<E>(key))
            .select_sql(Some(1), 0);
        Ok(self.fetch::<E>(&sql, binds, true)?.into_iter().next())
    }

    /// Loads every record whose key is in `keys`; unknown keys are skipped.
    ///
    /// # Panics
    /// - When the table does not have exactly one primary-key column.
    /// - When that column is not named `E::KEY_COLUMN`.
    /// - When its declared type's affinity cannot store `E::Key` values unchanged.
    pub fn find_all<E: Entity>(&self, keys: &[E::Key]) -> StoreResult<Vec<E>> {
        self.ensure_single_key::<E>()?;
        self.query::<E>().filter(Filter::key_in::<E>(keys)).to_list()
    }

    /// Schedules `entity` for insertion on the next flush.
    pub fn add<E: Entity>(&mut self, entity: E) -> StoreResult<()> {
        self.tracker.get_mut().add(entity)
    }

    pub fn add_range<E: Entity>(&mut self, entities: impl IntoIterator<Item = E>) -> StoreResult<()> {
        let tracker = self.tracker.get_mut();
        for entity in entities {
            tracker.add(entity)?;
        }
        Ok(())
    }

    /// Schedules `entity` for update. Untracked records are updated by key
    /// without an original-value check.
    pub fn update<E: Entity>(&mut self, entity: E) {
        self.tracker.get_mut().update(entity);
    }

    pub fn remove<E: Entity>(&mut self, entity: &E) {
        self.tracker.get_mut().remove(entity);
    }

    pub fn entry_state<E: Entity>(&self, key: &E::Key) -> Option<EntryState> {
        self.tracker.borrow().state_of::<E>(key)
    }

    pub fn has_changes(&self) -> bool {
        self.tracker.borrow().has_changes()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracker.borrow().len()
    }

    /// Forgets every tracked record, including unsaved changes.
    pub fn clear_tracking(&mut self) {
        self.tracker.get_mut().clear();
    }

    /// Flushes pending changes in one transaction and returns affected rows.
    ///
    /// # Errors
    /// - `Concurrency` when an update/delete matched no row with the original values.
    /// - `Update` when storage rejected a write with a constraint violation.
    /// - `Db` for any other storage failure.
    pub fn save_changes(&mut self) -> StoreResult<usize> {
        let started_at = Instant::now();
        let pending = self.tracker.get_mut().pending();
        if pending.is_empty() {
            debug!("event=save_changes module=store status=skipped pending=0");
            return Ok(0);
        }
        info!(
            "event=save_changes module=store status=start pending={}",
            pending.len()
        );

        let tx = self.conn.transaction()?;
        let mut conflicts = Vec::new();
        let mut rejected = Vec::new();
        let mut rejection_source = None;
        let mut affected = 0;

        for write in &pending {
            match apply_write(&tx, write) {
                Ok(0) => conflicts.push(write.report()),
                Ok(rows) => affected += rows,
                Err(err) if is_constraint_violation(&err) => {
                    rejected.push(write.report());
                    if rejection_source.is_none() {
                        rejection_source = Some(err);
                    }
                }
                Err(err) => {
                    error!(
                        "event=save_changes module=store status=error duration_ms={} error_code=write_failed error={}",
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(err.into());
                }
            }
        }

        let failure = if !conflicts.is_empty() {
            Some(StoreError::Concurrency(UpdateFault {
                entries: conflicts,
                source: None,
            }))
        } else if !rejected.is_empty() {
            Some(StoreError::Update(UpdateFault {
                entries: rejected,
                source: rejection_source,
            }))
        } else {
            None
        };

        if let Some(err) = failure {
            drop(tx);
            warn!(
                "event=save_changes module=store status=rolled_back duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }

        tx.commit()?;
        self.tracker.get_mut().accept_all();
        info!(
            "event=save_changes module=store status=ok affected={} duration_ms={}",
            affected,
            started_at.elapsed().as_millis()
        );
        Ok(affected)
    }

    pub(crate) fn tracks_queries(&self) -> bool {
        self.options.tracking == QueryTracking::TrackAll
    }

    pub(crate) fn fetch<E: Entity>(
        &self,
        sql: &str,
        binds: Vec<Value>,
        track: bool,
    ) -> StoreResult<Vec<E>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(binds), |row| E::from_row(row))?;

        let mut loaded = Vec::new();
        if track {
            let mut tracker = self.tracker.borrow_mut();
            for row in rows {
                loaded.push(tracker.attach_loaded(row?));
            }
        } else {
            for row in rows {
                loaded.push(row?);
            }
        }
        Ok(loaded)
    }

    pub(crate) fn count_rows(&self, sql: &str, binds: Vec<Value>) -> StoreResult<i64> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let count = stmt.query_row(params_from_iter(binds), |row| row.get::<_, i64>(0))?;
        Ok(count)
    }

    pub(crate) fn prepare_check(&self, sql: &str) -> StoreResult<()> {
        self.conn.prepare_cached(sql)?;
        Ok(())
    }

    /// Checks the table shape required by multi-key lookup.
    ///
    /// A missing table is left to the query itself to report.
    fn ensure_single_key<E: Entity>(&self) -> StoreResult<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({});", ident(E::TABLE)))?;
        let columns = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>("name")?,
                    row.get::<_, String>("type")?,
                    row.get::<_, i64>("pk")?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if columns.is_empty() {
            return Ok(());
        }

        let key_columns = columns
            .iter()
            .filter(|(_, _, pk)| *pk > 0)
            .collect::<Vec<_>>();
        if key_columns.len() != 1 {
            panic!(
                "only a single primary key column is supported: `{}` has {}",
                E::TABLE,
                key_columns.len()
            );
        }

        let (name, declared_type, _) = key_columns[0];
        if name.as_str() != E::KEY_COLUMN {
            panic!(
                "`{}` does not expose primary key `{}` as its key column (declared `{}`)",
                E::TYPE_NAME,
                name,
                E::KEY_COLUMN
            );
        }
        let column_affinity = Affinity::of_declared(declared_type);
        let key_affinity = <E::Key as KeyValue>::AFFINITY;
        if !column_affinity.stores(key_affinity) {
            panic!(
                "keys are not of the right type: `{}.{}` is `{}` ({:?} affinity), key type needs {:?}",
                E::TABLE,
                name,
                declared_type,
                column_affinity,
                key_affinity
            );
        }
        Ok(())
    }
}

fn apply_write(tx: &Transaction<'_>, write: &PendingWrite) -> rusqlite::Result<usize> {
    let (sql, binds) = match write.kind {
        WriteKind::Insert => insert_sql(write),
        WriteKind::Update => update_sql(write),
        WriteKind::Delete => delete_sql(write),
    };
    tx.execute(&sql, params_from_iter(binds))
}

fn insert_sql(write: &PendingWrite) -> (String, Vec<Value>) {
    let columns = std::iter::once(write.key_column)
        .chain(write.columns.iter().copied())
        .map(ident)
        .collect::<Vec<_>>();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        ident(write.table),
        columns.join(", ")
    );

    let mut binds = Vec::with_capacity(columns.len());
    binds.push(write.key.clone());
    binds.extend(write.current.iter().cloned());
    (sql, binds)
}

fn update_sql(write: &PendingWrite) -> (String, Vec<Value>) {
    let assignments = if write.columns.is_empty() {
        format!("{0} = {0}", ident(write.key_column))
    } else {
        write
            .columns
            .iter()
            .map(|column| format!("{} = ?", ident(column)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut sql = format!(
        "UPDATE {} SET {assignments} WHERE {} = ?",
        ident(write.table),
        ident(write.key_column)
    );

    let mut binds = write.current.clone();
    binds.push(write.key.clone());
    push_original_checks(write, &mut sql, &mut binds);
    sql.push(';');
    (sql, binds)
}

fn delete_sql(write: &PendingWrite) -> (String, Vec<Value>) {
    let mut sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        ident(write.table),
        ident(write.key_column)
    );
    let mut binds = vec![write.key.clone()];
    push_original_checks(write, &mut sql, &mut binds);
    sql.push(';');
    (sql, binds)
}

fn push_original_checks(write: &PendingWrite, sql: &mut String, binds: &mut Vec<Value>) {
    if let Some(original) = &write.original {
        for (column, value) in write.columns.iter().zip(original) {
            sql.push_str(&format!(" AND {} IS ?", ident(column)));
            binds.push(value.clone());
        }
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}
