//! Lazy, page-by-page query consumption.
//!
//! Pages use `LIMIT/OFFSET` over the query's deterministic ordering, so rows
//! written by the same session mid-stream may shift page boundaries.

use super::query::Query;
use super::StoreResult;
use crate::model::entity::Entity;
use std::collections::VecDeque;

/// Forward-only iterator over query results. It cannot be restarted.
pub struct EntityStream<'s, E: Entity> {
    query: Query<'s, E>,
    page_size: i64,
    offset: i64,
    buffer: VecDeque<E>,
    exhausted: bool,
}

impl<'s, E: Entity> EntityStream<'s, E> {
    /// Prepares the query once so malformed queries fail before iteration.
    pub(crate) fn open(query: Query<'s, E>) -> StoreResult<Self> {
        let page_size = i64::from(query.session().options().stream_page_size);
        let (sql, _) = query.select_sql(Some(page_size), 0);
        query.session().prepare_check(&sql)?;

        Ok(Self {
            query,
            page_size,
            offset: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }

    fn fill(&mut self) -> StoreResult<()> {
        let page = self.query.load(Some(self.page_size), self.offset)?;
        let fetched = i64::try_from(page.len()).unwrap_or(i64::MAX);
        self.offset = self.offset.saturating_add(fetched);
        if fetched < self.page_size {
            self.exhausted = true;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl<E: Entity> Iterator for EntityStream<'_, E> {
    type Item = StoreResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
