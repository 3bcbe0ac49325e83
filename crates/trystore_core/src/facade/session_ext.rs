//! `Outcome` wrappers for key lookups and flushes.

use super::{failure_message, log_failure, run};
use crate::model::entity::Entity;
use crate::outcome::{classify_save_error, OptionOutcomeExt, Outcome, ResultError};
use crate::store::Session;

const SESSION_TYPE_NAME: &str = "Session";

pub trait TrySessionExt {
    /// Key lookup; the identity map is consulted before storage.
    fn try_find<E: Entity>(&self, key: &E::Key) -> Outcome<Option<E>>;

    fn try_find_or<E: Entity>(
        &self,
        key: &E::Key,
        message_if_absent: impl Into<String>,
    ) -> Outcome<E>;

    /// Records for every known key in `keys`; unknown keys are skipped.
    ///
    /// # Panics
    /// - When `E`'s table shape does not allow single-key lookup.
    fn try_find_all<E: Entity>(&self, keys: &[E::Key]) -> Outcome<Vec<E>>;

    /// Flushes pending changes. Concurrency and constraint faults become
    /// composite errors listing the implicated records.
    fn try_save_changes(&mut self) -> Outcome<()>;
}

impl TrySessionExt for Session {
    fn try_find<E: Entity>(&self, key: &E::Key) -> Outcome<Option<E>> {
        run("try_find", E::TYPE_NAME, || self.find::<E>(key))
    }

    fn try_find_or<E: Entity>(
        &self,
        key: &E::Key,
        message_if_absent: impl Into<String>,
    ) -> Outcome<E> {
        self.try_find::<E>(key).collapse(message_if_absent)
    }

    fn try_find_all<E: Entity>(&self, keys: &[E::Key]) -> Outcome<Vec<E>> {
        run("try_find_all", E::TYPE_NAME, || self.find_all::<E>(keys))
    }

    fn try_save_changes(&mut self) -> Outcome<()> {
        let err = match self.save_changes() {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };

        let classified = match classify_save_error(err) {
            Ok(classified) => classified,
            Err(other) => ResultError::from_fault(&other)
                .context(failure_message("try_save_changes", SESSION_TYPE_NAME)),
        };
        log_failure("try_save_changes", SESSION_TYPE_NAME, &classified);
        Err(classified)
    }
}
