//! Query builder and SQL rendering.
//!
//! # Invariants
//! - Column names come from `&'static str` declarations and are always quoted.
//! - Every value is bound as a parameter, never interpolated.
//! - Results are ordered deterministically: explicit orderings first, key last.

use super::session::Session;
use super::stream::EntityStream;
use super::{StoreError, StoreResult};
use crate::model::entity::{Entity, KeyValue};
use rusqlite::types::Value;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn as_sql(self, value: &Value) -> &'static str {
        match (self, value) {
            (Self::Eq, Value::Null) => "IS",
            (Self::Ne, Value::Null) => "IS NOT",
            (Self::Eq, _) => "=",
            (Self::Ne, _) => "<>",
            (Self::Lt, _) => "<",
            (Self::Le, _) => "<=",
            (Self::Gt, _) => ">",
            (Self::Ge, _) => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Row predicate rendered into a `WHERE` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: &'static str,
        op: Comparison,
        value: Value,
    },
    In {
        column: &'static str,
        values: Vec<Value>,
    },
    IsNull(&'static str),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(column: &'static str, op: Comparison, value: impl Into<Value>) -> Self {
        Self::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Eq, value)
    }

    pub fn ne(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Ne, value)
    }

    pub fn lt(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Lt, value)
    }

    pub fn le(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Le, value)
    }

    pub fn gt(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Gt, value)
    }

    pub fn ge(column: &'static str, value: impl Into<Value>) -> Self {
        Self::compare(column, Comparison::Ge, value)
    }

    /// Matches the record whose key equals `key`.
    pub fn key<E: Entity>(key: &E::Key) -> Self {
        Self::Compare {
            column: E::KEY_COLUMN,
            op: Comparison::Eq,
            value: key.to_sql_value(),
        }
    }

    /// Matches records whose key is one of `keys`.
    pub fn key_in<E: Entity>(keys: &[E::Key]) -> Self {
        Self::In {
            column: E::KEY_COLUMN,
            values: keys.iter().map(KeyValue::to_sql_value).collect(),
        }
    }

    pub fn is_in<V: Into<Value>>(column: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: &'static str) -> Self {
        Self::IsNull(column)
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub(crate) fn render(&self, sql: &mut String, binds: &mut Vec<Value>) {
        match self {
            Self::Compare { column, op, value } => {
                sql.push_str(&format!("{} {} ?", ident(column), op.as_sql(value)));
                binds.push(value.clone());
            }
            Self::In { column, values } => {
                if values.is_empty() {
                    sql.push_str("0 = 1");
                    return;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{} IN ({placeholders})", ident(column)));
                binds.extend(values.iter().cloned());
            }
            Self::IsNull(column) => sql.push_str(&format!("{} IS NULL", ident(column))),
            Self::And(filters) => render_group(filters, " AND ", "1 = 1", sql, binds),
            Self::Or(filters) => render_group(filters, " OR ", "0 = 1", sql, binds),
            Self::Not(inner) => {
                sql.push_str("NOT (");
                inner.render(sql, binds);
                sql.push(')');
            }
        }
    }
}

fn render_group(
    filters: &[Filter],
    separator: &str,
    empty: &str,
    sql: &mut String,
    binds: &mut Vec<Value>,
) {
    if filters.is_empty() {
        sql.push_str(empty);
        return;
    }
    for (index, filter) in filters.iter().enumerate() {
        if index > 0 {
            sql.push_str(separator);
        }
        sql.push('(');
        filter.render(sql, binds);
        sql.push(')');
    }
}

pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Deferred query over one entity type.
///
/// Nothing touches storage until a terminal operation runs.
pub struct Query<'s, E: Entity> {
    session: &'s Session,
    filter: Option<Filter>,
    order: Vec<(&'static str, Direction)>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Query<'_, E> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            filter: self.filter.clone(),
            order: self.order.clone(),
            _entity: PhantomData,
        }
    }
}

impl<'s, E: Entity> Query<'s, E> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self {
            session,
            filter: None,
            order: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Adds a predicate; repeated calls are combined with `AND`.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
        self.order.push((column, direction));
        self
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// First matching record, or `None` for an empty result.
    pub fn first(&self) -> StoreResult<Option<E>> {
        Ok(self.load(Some(1), 0)?.into_iter().next())
    }

    /// The only matching record, or `None` for an empty result.
    ///
    /// # Errors
    /// - `MultipleMatches` when two or more rows match.
    pub fn single(&self) -> StoreResult<Option<E>> {
        let mut rows = self.load(Some(2), 0)?;
        if rows.len() > 1 {
            return Err(StoreError::MultipleMatches {
                type_name: E::TYPE_NAME,
            });
        }
        Ok(rows.pop())
    }

    /// # Errors
    /// - `CountOverflow` when the count exceeds `i32::MAX`.
    pub fn count(&self) -> StoreResult<i32> {
        let count = self.long_count()?;
        i32::try_from(count).map_err(|_| StoreError::CountOverflow {
            type_name: E::TYPE_NAME,
            count,
        })
    }

    pub fn long_count(&self) -> StoreResult<i64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", ident(E::TABLE));
        let mut binds = Vec::new();
        self.push_where(&mut sql, &mut binds);
        self.session.count_rows(&sql, binds)
    }

    pub fn to_list(&self) -> StoreResult<Vec<E>> {
        self.load(None, 0)
    }

    /// Opens a lazy, page-by-page stream over the matching records.
    pub fn stream(self) -> StoreResult<EntityStream<'s, E>> {
        EntityStream::open(self)
    }

    pub(crate) fn load(&self, limit: Option<i64>, offset: i64) -> StoreResult<Vec<E>> {
        let (sql, binds) = self.select_sql(limit, offset);
        self.session
            .fetch(&sql, binds, self.session.tracks_queries())
    }

    pub(crate) fn select_sql(&self, limit: Option<i64>, offset: i64) -> (String, Vec<Value>) {
        let columns = std::iter::once(E::KEY_COLUMN)
            .chain(E::COLUMNS.iter().copied())
            .map(ident)
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {columns} FROM {}", ident(E::TABLE));
        let mut binds = Vec::new();
        self.push_where(&mut sql, &mut binds);

        let mut orderings = self
            .order
            .iter()
            .map(|(column, direction)| {
                let keyword = match direction {
                    Direction::Ascending => "ASC",
                    Direction::Descending => "DESC",
                };
                format!("{} {keyword}", ident(column))
            })
            .collect::<Vec<_>>();
        if !self.order.iter().any(|(column, _)| *column == E::KEY_COLUMN) {
            orderings.push(format!("{} ASC", ident(E::KEY_COLUMN)));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&orderings.join(", "));

        match limit {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                binds.push(Value::Integer(limit));
                if offset > 0 {
                    sql.push_str(" OFFSET ?");
                    binds.push(Value::Integer(offset));
                }
            }
            None if offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                binds.push(Value::Integer(offset));
            }
            None => {}
        }

        (sql, binds)
    }

    fn push_where(&self, sql: &mut String, binds: &mut Vec<Value>) {
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render(sql, binds);
        }
    }
}
