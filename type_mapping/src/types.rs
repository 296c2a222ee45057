//! Type mapping definitions
//!
//! This module provides the runtime value carried by fields, rows and filters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sql::{quote_string, Dialect};
use crate::validate::format_timestamp;

/// A single SQL value as it travels between input, fields and the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
    Timestamp(NaiveDateTime),
    Boolean(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Integer(_) => "integer",
            SqlValue::Text(_) => "string",
            SqlValue::Timestamp(_) => "datetime",
            SqlValue::Boolean(_) => "boolean",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Render the value as a literal that can be embedded into SQL text.
    ///
    /// Text and timestamps are single-quoted, text is escaped with
    /// [`quote_string`] for `dialect`.
    pub fn to_sql_literal(&self, dialect: Dialect) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(v) => v.to_string(),
            SqlValue::Text(v) => quote_string(v, dialect),
            SqlValue::Timestamp(v) => format!("'{}'", format_timestamp(v)),
            SqlValue::Boolean(true) => "TRUE".to_string(),
            SqlValue::Boolean(false) => "FALSE".to_string(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "{}", v),
            SqlValue::Timestamp(v) => write!(f, "{}", format_timestamp(v)),
            SqlValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for SqlValue {
    fn from(val: String) -> Self {
        SqlValue::Text(val)
    }
}

impl From<&str> for SqlValue {
    fn from(val: &str) -> Self {
        SqlValue::Text(val.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(val: i64) -> Self {
        SqlValue::Integer(val)
    }
}

impl From<i32> for SqlValue {
    fn from(val: i32) -> Self {
        SqlValue::Integer(i64::from(val))
    }
}

impl From<u32> for SqlValue {
    fn from(val: u32) -> Self {
        SqlValue::Integer(i64::from(val))
    }
}

impl From<bool> for SqlValue {
    fn from(val: bool) -> Self {
        SqlValue::Boolean(val)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(val: NaiveDateTime) -> Self {
        SqlValue::Timestamp(val)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_literals() {
        let mysql = Dialect::MySql;
        assert_eq!(SqlValue::Null.to_sql_literal(mysql), "NULL");
        assert_eq!(SqlValue::from(-42i64).to_sql_literal(mysql), "-42");
        assert_eq!(SqlValue::from(true).to_sql_literal(mysql), "TRUE");
        assert_eq!(SqlValue::from(false).to_sql_literal(mysql), "FALSE");
        assert_eq!(SqlValue::from("plain").to_sql_literal(mysql), "'plain'");
        assert_eq!(
            SqlValue::from("it's").to_sql_literal(Dialect::Sqlite),
            "'it''s'"
        );
    }

    #[test]
    fn test_timestamp_literal() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 0))
            .unwrap();
        assert_eq!(
            SqlValue::from(ts).to_sql_literal(Dialect::Sqlite),
            "'2024-03-09 07:05:00'"
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".to_string()));
    }
}
