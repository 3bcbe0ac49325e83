//! `Outcome` wrappers for query terminal operations.

use super::{failure_message, run};
use crate::model::entity::Entity;
use crate::outcome::{OptionOutcomeExt, Outcome, ResultError};
use crate::store::{EntityStream, Filter, Query};

/// Fallible-by-value query operations.
pub trait TryQueryExt<'s, E: Entity> {
    /// First match, or `Ok(None)` when nothing matches.
    fn try_first(&self) -> Outcome<Option<E>>;

    /// First match; an empty result fails with `message_if_absent`.
    fn try_first_or(&self, message_if_absent: impl Into<String>) -> Outcome<E>;

    fn try_first_where(&self, predicate: Filter) -> Outcome<Option<E>>;

    fn try_first_where_or(
        &self,
        predicate: Filter,
        message_if_absent: impl Into<String>,
    ) -> Outcome<E>;

    /// The only match, `Ok(None)` when nothing matches, and a failure for
    /// two or more matches.
    fn try_single(&self) -> Outcome<Option<E>>;

    fn try_single_or(&self, message_if_absent: impl Into<String>) -> Outcome<E>;

    fn try_single_where(&self, predicate: Filter) -> Outcome<Option<E>>;

    fn try_single_where_or(
        &self,
        predicate: Filter,
        message_if_absent: impl Into<String>,
    ) -> Outcome<E>;

    fn try_count(&self) -> Outcome<i32>;

    fn try_long_count(&self) -> Outcome<i64>;

    fn try_to_list(&self) -> Outcome<Vec<E>>;

    /// Lazy, forward-only results. Creation fails for malformed queries;
    /// later page failures surface as one `Err` item that ends the stream.
    fn try_stream(self) -> Outcome<TryStream<'s, E>>;
}

impl<'s, E: Entity> TryQueryExt<'s, E> for Query<'s, E> {
    fn try_first(&self) -> Outcome<Option<E>> {
        run("try_first", E::TYPE_NAME, || self.first())
    }

    fn try_first_or(&self, message_if_absent: impl Into<String>) -> Outcome<E> {
        self.try_first().collapse(message_if_absent)
    }

    fn try_first_where(&self, predicate: Filter) -> Outcome<Option<E>> {
        self.clone().filter(predicate).try_first()
    }

    fn try_first_where_or(
        &self,
        predicate: Filter,
        message_if_absent: impl Into<String>,
    ) -> Outcome<E> {
        self.try_first_where(predicate).collapse(message_if_absent)
    }

    fn try_single(&self) -> Outcome<Option<E>> {
        run("try_single", E::TYPE_NAME, || self.single())
    }

    fn try_single_or(&self, message_if_absent: impl Into<String>) -> Outcome<E> {
        self.try_single().collapse(message_if_absent)
    }

    fn try_single_where(&self, predicate: Filter) -> Outcome<Option<E>> {
        self.clone().filter(predicate).try_single()
    }

    fn try_single_where_or(
        &self,
        predicate: Filter,
        message_if_absent: impl Into<String>,
    ) -> Outcome<E> {
        self.try_single_where(predicate).collapse(message_if_absent)
    }

    fn try_count(&self) -> Outcome<i32> {
        run("try_count", E::TYPE_NAME, || self.count())
    }

    fn try_long_count(&self) -> Outcome<i64> {
        run("try_long_count", E::TYPE_NAME, || self.long_count())
    }

    fn try_to_list(&self) -> Outcome<Vec<E>> {
        run("try_to_list", E::TYPE_NAME, || self.to_list())
    }

    fn try_stream(self) -> Outcome<TryStream<'s, E>> {
        run("try_stream", E::TYPE_NAME, || self.stream()).map(|inner| TryStream { inner })
    }
}

/// `EntityStream` whose items are `Outcome`s.
pub struct TryStream<'s, E: Entity> {
    inner: EntityStream<'s, E>,
}

impl<E: Entity> Iterator for TryStream<'_, E> {
    type Item = Outcome<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| {
            item.map_err(|err| {
                ResultError::from_fault(&err)
                    .context(failure_message("try_stream", E::TYPE_NAME))
            })
        })
    }
}
