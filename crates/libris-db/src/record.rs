use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::Row;

pub use rusqlite::types::Value;

use crate::error::{StoreError, StoreResult};

/// Named bound parameters, keyed without the leading `:`.
pub type Params = BTreeMap<String, Value>;

/// One row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub(crate) fn from_row(row: &Row<'_>, names: &[String]) -> rusqlite::Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.push((name.clone(), row.get::<_, Value>(idx)?));
        }
        Ok(Self { columns })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    // -- Typed accessors used by the row models --

    pub fn int(&self, column: &str) -> StoreResult<i64> {
        match self.get(column) {
            Some(Value::Integer(v)) => Ok(*v),
            _ => Err(StoreError::decode(column)),
        }
    }

    pub fn opt_int(&self, column: &str) -> StoreResult<Option<i64>> {
        match self.get(column) {
            Some(Value::Integer(v)) => Ok(Some(*v)),
            Some(Value::Null) => Ok(None),
            _ => Err(StoreError::decode(column)),
        }
    }

    pub fn text(&self, column: &str) -> StoreResult<String> {
        match self.get(column) {
            Some(Value::Text(v)) => Ok(v.clone()),
            _ => Err(StoreError::decode(column)),
        }
    }

    pub fn opt_text(&self, column: &str) -> StoreResult<Option<String>> {
        match self.get(column) {
            Some(Value::Text(v)) => Ok(Some(v.clone())),
            Some(Value::Null) => Ok(None),
            _ => Err(StoreError::decode(column)),
        }
    }

    pub fn timestamp(&self, column: &str) -> StoreResult<DateTime<Utc>> {
        let raw = self.text(column)?;
        parse_timestamp(&raw).ok_or_else(|| StoreError::decode(column))
    }
}

/// Timestamps are written as RFC 3339. Rows created by SQLite defaults use
/// `YYYY-MM-DD HH:MM:SS` without a zone and are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .ok()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

/// Ordered column assignments for inserts and updates.
/// Setting a column twice keeps the first position and the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pairs: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.pairs
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> Vec<&str> {
        self.pairs.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (column, value) in iter {
            fields.set(&column, value);
        }
        fields
    }
}

/// AND-combined equality filters, e.g. `Filters::new().eq("id", 7)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Fields);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.set(column, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
