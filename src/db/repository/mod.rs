//! Repository layer — entity-scoped database operations.
//!
//! Each entity module exposes insert / get / update / delete plus
//! `find_*` and `count_*` driven by the typed filters in `models::filters`.
//! Callers own transaction boundaries; every function here works on a
//! plain `&Connection` so it composes inside a `Transaction`.

mod appointment;
mod doctor;
mod patient;
mod sequence;

use rusqlite::types::Value;
use uuid::Uuid;

use super::DatabaseError;

pub use appointment::*;
pub use doctor::*;
pub use patient::*;
pub use sequence::*;

/// AND-ed equality / inequality predicates rendered into a WHERE clause.
///
/// Column names always come from code; only values are bound.
#[derive(Debug, Default)]
pub(crate) struct Predicate {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Predicate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self.clauses.push(format!("{column} = ?{}", self.values.len()));
        self
    }

    pub(crate) fn ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self.clauses.push(format!("{column} != ?{}", self.values.len()));
        self
    }

    pub(crate) fn eq_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub(crate) fn ne_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.ne(column, v),
            None => self,
        }
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, Value>> {
        rusqlite::params_from_iter(self.values.iter())
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_optional_uuid(raw: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    raw.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<chrono::NaiveDateTime, DatabaseError> {
    chrono::NaiveDateTime::parse_from_str(raw, crate::models::TIMESTAMP_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("created_at '{raw}': {e}")))
}
