//! Identity map and pending change set.

use super::{EntryReport, StoreError, StoreResult};
use crate::model::entity::{column_values, Entity, FieldSnapshot, KeyValue};
use rusqlite::types::Value;
use std::any::Any;
use std::collections::HashMap;

/// Lifecycle state of a tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

type EntryKey = (&'static str, String);

struct TrackedEntry {
    seq: u64,
    type_name: &'static str,
    table: &'static str,
    key_column: &'static str,
    columns: &'static [&'static str],
    key: Value,
    key_repr: String,
    original: Option<Vec<Value>>,
    current: Vec<Value>,
    state: EntryState,
    instance: Box<dyn Any + Send>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// Detached copy of one pending change, consumed by a flush.
#[derive(Debug, Clone)]
pub(crate) struct PendingWrite {
    pub(crate) kind: WriteKind,
    pub(crate) state: EntryState,
    pub(crate) type_name: &'static str,
    pub(crate) table: &'static str,
    pub(crate) key_column: &'static str,
    pub(crate) columns: &'static [&'static str],
    pub(crate) key: Value,
    pub(crate) key_repr: String,
    pub(crate) original: Option<Vec<Value>>,
    pub(crate) current: Vec<Value>,
}

impl PendingWrite {
    pub(crate) fn report(&self) -> EntryReport {
        EntryReport {
            type_name: self.type_name,
            key: self.key_repr.clone(),
            state: self.state,
            original: self.original.as_ref().map(|values| self.fields(values)),
            current: self.fields(&self.current),
        }
    }

    fn fields(&self, values: &[Value]) -> FieldSnapshot {
        let mut fields = Vec::with_capacity(values.len() + 1);
        fields.push((self.key_column, self.key.clone()));
        fields.extend(self.columns.iter().copied().zip(values.iter().cloned()));
        fields
    }
}

#[derive(Default)]
pub(crate) struct ChangeTracker {
    entries: HashMap<EntryKey, TrackedEntry>,
    next_seq: u64,
}

fn entry_key<E: Entity>(key: &E::Key) -> EntryKey {
    (E::TABLE, key.to_string())
}

impl ChangeTracker {
    /// Returns the tracked instance unless it is marked for deletion.
    pub(crate) fn get<E: Entity>(&self, key: &E::Key) -> Option<E> {
        self.entries
            .get(&entry_key::<E>(key))
            .filter(|entry| entry.state != EntryState::Deleted)
            .and_then(|entry| entry.instance.downcast_ref::<E>())
            .cloned()
    }

    pub(crate) fn state_of<E: Entity>(&self, key: &E::Key) -> Option<EntryState> {
        self.entries
            .get(&entry_key::<E>(key))
            .map(|entry| entry.state)
    }

    /// Resolves a freshly loaded row through the identity map.
    ///
    /// An already tracked instance wins over the stored row.
    pub(crate) fn attach_loaded<E: Entity>(&mut self, entity: E) -> E {
        let key = entry_key::<E>(&entity.key());
        if let Some(existing) = self
            .entries
            .get(&key)
            .and_then(|entry| entry.instance.downcast_ref::<E>())
        {
            return existing.clone();
        }

        let values = column_values(&entity);
        self.insert(key, &entity, Some(values.clone()), values, EntryState::Unchanged);
        entity
    }

    pub(crate) fn add<E: Entity>(&mut self, entity: E) -> StoreResult<()> {
        let key = entry_key::<E>(&entity.key());
        match self.entries.get_mut(&key) {
            Some(existing) if existing.state == EntryState::Deleted => {
                existing.current = column_values(&entity);
                existing.instance = Box::new(entity);
                existing.state = EntryState::Modified;
                Ok(())
            }
            Some(_) => Err(StoreError::AlreadyTracked {
                type_name: E::TYPE_NAME,
                key: key.1,
            }),
            None => {
                let values = column_values(&entity);
                self.insert(key, &entity, None, values, EntryState::Added);
                Ok(())
            }
        }
    }

    pub(crate) fn update<E: Entity>(&mut self, entity: E) {
        let key = entry_key::<E>(&entity.key());
        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.current = column_values(&entity);
                existing.instance = Box::new(entity);
                if existing.state != EntryState::Added {
                    existing.state = EntryState::Modified;
                }
            }
            None => {
                let values = column_values(&entity);
                self.insert(key, &entity, None, values, EntryState::Modified);
            }
        }
    }

    pub(crate) fn remove<E: Entity>(&mut self, entity: &E) {
        let key = entry_key::<E>(&entity.key());
        match self.entries.get(&key).map(|entry| entry.state) {
            Some(EntryState::Added) => {
                self.entries.remove(&key);
            }
            Some(_) => {
                if let Some(existing) = self.entries.get_mut(&key) {
                    existing.state = EntryState::Deleted;
                }
            }
            None => {
                let values = column_values(entity);
                self.insert(key, entity, None, values, EntryState::Deleted);
            }
        }
    }

    pub(crate) fn has_changes(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.state != EntryState::Unchanged)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pending writes in the order they were first tracked.
    pub(crate) fn pending(&self) -> Vec<PendingWrite> {
        let mut pending = self
            .entries
            .values()
            .filter_map(|entry| {
                let kind = match entry.state {
                    EntryState::Unchanged => return None,
                    EntryState::Added => WriteKind::Insert,
                    EntryState::Modified => WriteKind::Update,
                    EntryState::Deleted => WriteKind::Delete,
                };
                Some((
                    entry.seq,
                    PendingWrite {
                        kind,
                        state: entry.state,
                        type_name: entry.type_name,
                        table: entry.table,
                        key_column: entry.key_column,
                        columns: entry.columns,
                        key: entry.key.clone(),
                        key_repr: entry.key_repr.clone(),
                        original: entry.original.clone(),
                        current: entry.current.clone(),
                    },
                ))
            })
            .collect::<Vec<_>>();
        pending.sort_by_key(|(seq, _)| *seq);
        pending.into_iter().map(|(_, write)| write).collect()
    }

    /// Marks a successful flush: deletions are forgotten, current becomes original.
    pub(crate) fn accept_all(&mut self) {
        self.entries
            .retain(|_, entry| entry.state != EntryState::Deleted);
        for entry in self.entries.values_mut() {
            entry.original = Some(entry.current.clone());
            entry.state = EntryState::Unchanged;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert<E: Entity>(
        &mut self,
        key: EntryKey,
        entity: &E,
        original: Option<Vec<Value>>,
        current: Vec<Value>,
        state: EntryState,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let entry = TrackedEntry {
            seq,
            type_name: E::TYPE_NAME,
            table: E::TABLE,
            key_column: E::KEY_COLUMN,
            columns: E::COLUMNS,
            key: entity.key().to_sql_value(),
            key_repr: key.1.clone(),
            original,
            current,
            state,
            instance: Box::new(entity.clone()),
        };
        self.entries.insert(key, entry);
    }
}
