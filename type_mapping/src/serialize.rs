//! JSON conversion utilities
//!
//! Request input arrives as JSON and responses leave as JSON; this module
//! converts between that form and [`SqlValue`].

use crate::types::SqlValue;
use crate::validate::format_timestamp;
use std::collections::HashMap;

impl SqlValue {
    /// Convert a scalar JSON value. Arrays, objects and non-integral numbers
    /// have no column representation and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<SqlValue> {
        match value {
            serde_json::Value::Null => Some(SqlValue::Null),
            serde_json::Value::Bool(b) => Some(SqlValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(SqlValue::Integer),
            serde_json::Value::String(s) => Some(SqlValue::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Integer(v) => serde_json::Value::from(*v),
            SqlValue::Text(v) => serde_json::Value::String(v.clone()),
            SqlValue::Timestamp(v) => serde_json::Value::String(format_timestamp(v)),
            SqlValue::Boolean(v) => serde_json::Value::Bool(*v),
        }
    }
}

/// Convert a JSON object into a column map.
///
/// Returns the offending key when a value cannot be represented.
pub fn json_object_to_row(
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<HashMap<String, SqlValue>, String> {
    let mut row = HashMap::with_capacity(object.len());
    for (key, value) in object {
        let converted = SqlValue::from_json(value).ok_or_else(|| key.clone())?;
        row.insert(key.clone(), converted);
    }
    Ok(row)
}

/// Convert a column map into a JSON object
pub fn row_to_json(row: &HashMap<String, SqlValue>) -> serde_json::Value {
    let map = row
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}
