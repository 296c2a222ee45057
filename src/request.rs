//! Request and response envelopes
//!
//! A request names a registered group and an action; the response is the
//! generic success/failure envelope handed back to clients.

use crate::errors::RecordHausError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Update,
    Delete,
    Select,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Select => "select",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RecordHausError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Action::Add),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "select" => Ok(Action::Select),
            other => Err(RecordHausError::RequestFormat(format!(
                "unknown action '{}'",
                other
            ))),
        }
    }
}

/// A routed request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub group: String,
    pub action: Action,
    /// Input of add/update/delete
    pub data: Value,
    /// Column/value pairs of select, matched with equality
    pub params: Value,
}

/// Wire shape: `{"timestamp": .., "info": {"group": .., "action": ..}, "data": .., "params": ..}`
#[derive(Deserialize)]
struct WireRequest {
    timestamp: Option<Value>,
    info: Option<WireInfo>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct WireInfo {
    group: String,
    action: String,
}

impl Request {
    pub fn new(group: impl Into<String>, action: Action) -> Self {
        Self {
            group: group.into(),
            action,
            data: Value::Null,
            params: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Parse a request body in wire shape
    pub fn from_json(body: &str) -> Result<Self, RecordHausError> {
        let wire: WireRequest = serde_json::from_str(body)
            .map_err(|e| RecordHausError::RequestFormat(e.to_string()))?;
        if wire.timestamp.is_none() {
            return Err(RecordHausError::RequestFormat(
                "Key 'timestamp' is missing".to_string(),
            ));
        }
        let info = wire.info.ok_or_else(|| {
            RecordHausError::RequestFormat("Key 'info' is missing".to_string())
        })?;
        Ok(Self {
            group: info.group,
            action: info.action.parse()?,
            data: wire.data,
            params: wire.params,
        })
    }
}

/// Generic success/failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Unix time the response was produced
    pub timestamp: i64,
    pub data: Value,
    pub success: bool,
    pub errno: u16,
    pub error: String,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            data,
            success: true,
            errno: 0,
            error: String::new(),
        }
    }

    pub fn failure(error: &RecordHausError) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            data: Value::Null,
            success: false,
            errno: error.code(),
            error: error.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "timestamp": self.timestamp,
            "data": self.data,
            "success": self.success,
            "errno": self.errno,
            "error": self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wire_request() {
        let body = r#"{
            "timestamp": 1700000000,
            "info": {"group": "accounts", "action": "update"},
            "data": {"main": {"id": 1, "name": "Alice"}}
        }"#;
        let request = Request::from_json(body).unwrap();
        assert_eq!(request.group, "accounts");
        assert_eq!(request.action, Action::Update);
        assert_eq!(request.data["main"]["name"], json!("Alice"));
        assert_eq!(request.params, Value::Null);
    }

    #[test]
    fn test_missing_keys_are_format_errors() {
        let no_timestamp = Request::from_json(r#"{"info": {"group": "a", "action": "add"}}"#);
        assert!(matches!(no_timestamp, Err(RecordHausError::RequestFormat(_))));

        let no_info = Request::from_json(r#"{"timestamp": 1}"#);
        assert!(matches!(no_info, Err(RecordHausError::RequestFormat(_))));

        let bad_action =
            Request::from_json(r#"{"timestamp": 1, "info": {"group": "a", "action": "drop"}}"#);
        assert!(matches!(bad_action, Err(RecordHausError::RequestFormat(_))));
    }

    #[test]
    fn test_failure_envelope() {
        let response = Response::failure(&RecordHausError::UnknownGroup("ghosts".to_string()));
        assert!(!response.success);
        assert_eq!(response.errno, 60);
        assert_eq!(response.error, "Group 'ghosts' cannot be mapped");
        assert_eq!(response.to_json()["data"], Value::Null);
    }
}
