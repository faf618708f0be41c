//! Positional, explicitly typed statement parameters
//!
//! Each parameter is assigned to a 1-based `$N` slot with a typed setter.
//! Binary payloads reach the driver as a byte-array parameter at a known
//! position, never through a generic struct-to-column mapping or a bulk bind.

use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;
use std::collections::BTreeMap;

use crate::error::{ImportError, Result};

/// One bound value with its SQL type fixed at assignment time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(Option<String>),
    BigInt(Option<i64>),
    Bytes(Option<Vec<u8>>),
}

impl SqlParam {
    pub fn is_null(&self) -> bool {
        match self {
            SqlParam::Text(v) => v.is_none(),
            SqlParam::BigInt(v) => v.is_none(),
            SqlParam::Bytes(v) => v.is_none(),
        }
    }
}

/// SQL text plus its parameters keyed by position
#[derive(Debug, Clone)]
pub struct PositionalStatement {
    sql: &'static str,
    slots: BTreeMap<usize, SqlParam>,
    conflicts: Vec<usize>,
}

impl PositionalStatement {
    pub fn new(sql: &'static str) -> Self {
        Self {
            sql,
            slots: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn sql(&self) -> &'static str {
        self.sql
    }

    pub fn set_text(self, index: usize, value: Option<&str>) -> Self {
        self.set(index, SqlParam::Text(value.map(str::to_string)))
    }

    /// Text parameter where empty or blank text is bound as SQL `NULL`
    pub fn set_date(self, index: usize, value: Option<&str>) -> Self {
        let value = value.filter(|v| !v.trim().is_empty());
        self.set(index, SqlParam::Text(value.map(str::to_string)))
    }

    pub fn set_long(self, index: usize, value: i64) -> Self {
        self.set(index, SqlParam::BigInt(Some(value)))
    }

    pub fn set_bytes(self, index: usize, value: Option<&[u8]>) -> Self {
        self.set(index, SqlParam::Bytes(value.map(<[u8]>::to_vec)))
    }

    fn set(mut self, index: usize, param: SqlParam) -> Self {
        if index == 0 || self.slots.insert(index, param).is_some() {
            self.conflicts.push(index);
        }
        self
    }

    /// Value assigned to a slot, if any
    pub fn param(&self, index: usize) -> Option<&SqlParam> {
        self.slots.get(&index)
    }

    /// Parameters in position order, after checking every `$N` in the SQL has
    /// exactly one value and no value sits outside `1..=n`
    pub fn ordered(&self) -> Result<Vec<&SqlParam>> {
        if !self.conflicts.is_empty() {
            return Err(ImportError::Statement(format!(
                "slots {:?} assigned more than once or out of range",
                self.conflicts
            )));
        }

        let declared = placeholder_count(self.sql);
        let expected: Vec<usize> = (1..=declared).collect();
        let assigned: Vec<usize> = self.slots.keys().copied().collect();
        if assigned != expected {
            return Err(ImportError::Statement(format!(
                "statement declares {} parameters but slots {:?} were assigned",
                declared, assigned
            )));
        }

        Ok(self.slots.values().collect())
    }

    /// Build the sqlx query, binding each slot with its concrete type in order
    pub fn query(&self) -> Result<Query<'_, Any, AnyArguments<'_>>> {
        let mut query = sqlx::query::<Any>(self.sql);
        for param in self.ordered()? {
            query = match param {
                SqlParam::Text(value) => query.bind(value.as_deref()),
                SqlParam::BigInt(value) => query.bind(*value),
                SqlParam::Bytes(value) => query.bind(value.as_deref()),
            };
        }
        Ok(query)
    }
}

/// Highest `$N` placeholder in `sql`. Quoted literals are not expected in the
/// statements this crate issues.
fn placeholder_count(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut max = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if let Ok(n) = sql[start..end].parse::<usize>() {
                max = max.max(n);
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    max
}
