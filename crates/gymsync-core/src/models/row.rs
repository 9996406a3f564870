//! Schema-agnostic row model

use serde::{Deserialize, Serialize};

/// Name of the identity column every catalog table carries.
pub const ID_COLUMN: &str = "id";
/// Last-write marker, written by the domain layer.
pub const UPDATED_AT_COLUMN: &str = "updated_at";
/// Tombstone marker; non-empty means logically deleted.
pub const DELETED_AT_COLUMN: &str = "deleted_at";

/// A single typed scalar as stored by `SQLite`/libSQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SqlValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<libsql::Value> for SqlValue {
    fn from(value: libsql::Value) -> Self {
        match value {
            libsql::Value::Null => Self::Null,
            libsql::Value::Integer(value) => Self::Integer(value),
            libsql::Value::Real(value) => Self::Real(value),
            libsql::Value::Text(value) => Self::Text(value),
            libsql::Value::Blob(value) => Self::Blob(value),
        }
    }
}

impl From<SqlValue> for libsql::Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(value) => Self::Integer(value),
            SqlValue::Real(value) => Self::Real(value),
            SqlValue::Text(value) => Self::Text(value),
            SqlValue::Blob(value) => Self::Blob(value),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A row as an ordered list of `(column, value)` pairs.
///
/// Column order follows the order the source store returned them in, and the
/// full column set is relayed to the destination untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Builder-style column setter.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing the value in place if the column already exists.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.columns.iter_mut().find(|(name, _)| *name == column) {
            slot.1 = value;
        } else {
            self.columns.push((column, value));
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The row identity rendered as text.
    ///
    /// Integer ids are accepted for stores whose `id` column has integer
    /// affinity.
    pub fn id(&self) -> Option<String> {
        match self.get(ID_COLUMN)? {
            SqlValue::Text(value) if !value.is_empty() => Some(value.clone()),
            SqlValue::Integer(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// A row is tombstoned when `deleted_at` holds any non-empty value.
    pub fn is_tombstoned(&self) -> bool {
        match self.get(DELETED_AT_COLUMN) {
            None | Some(SqlValue::Null) => false,
            Some(SqlValue::Text(value)) => !value.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_preserves_column_order_and_replaces_in_place() {
        let mut row = Row::new().with("id", "m1").with("name", "Ann").with("age", 30_i64);
        row.set("name", "Anna");

        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["id", "name", "age"]);
        assert_eq!(row.get("name"), Some(&SqlValue::Text("Anna".to_string())));
    }

    #[test]
    fn id_accepts_text_and_integer() {
        assert_eq!(Row::new().with("id", "m1").id().as_deref(), Some("m1"));
        assert_eq!(Row::new().with("id", 7_i64).id().as_deref(), Some("7"));
        assert_eq!(Row::new().with("id", "").id(), None);
        assert_eq!(Row::new().with("name", "x").id(), None);
    }

    #[test]
    fn tombstone_requires_non_empty_deleted_at() {
        assert!(!Row::new().with("id", "a").is_tombstoned());
        assert!(!Row::new()
            .with("id", "a")
            .with("deleted_at", SqlValue::Null)
            .is_tombstoned());
        assert!(!Row::new().with("id", "a").with("deleted_at", "  ").is_tombstoned());
        assert!(Row::new()
            .with("id", "a")
            .with("deleted_at", "2026-01-02T03:04:05Z")
            .is_tombstoned());
    }

    #[test]
    fn converts_to_and_from_libsql_values() {
        let original = SqlValue::Real(1.5);
        let libsql_value: libsql::Value = original.clone().into();
        assert_eq!(SqlValue::from(libsql_value), original);
        assert_eq!(SqlValue::from(None::<&str>), SqlValue::Null);
    }
}
