//! Database event types and definitions
//!
//! This module defines the structure of database events
//! that flow through the signal system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::SqlValue;

/// Database event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Added,
    Changed,
    Deleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Added => "added",
            EventType::Changed => "changed",
            EventType::Deleted => "deleted",
        }
    }
}

/// Database event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseEvent {
    /// Event type
    pub event_type: EventType,
    /// Table name
    pub table_name: String,
    /// Primary key of the written row (if known)
    pub record_id: Option<i64>,
    /// Written column values
    pub payload: HashMap<String, SqlValue>,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DatabaseEvent {
    pub fn new(event_type: EventType, table_name: impl Into<String>) -> Self {
        Self {
            event_type,
            table_name: table_name.into(),
            record_id: None,
            payload: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_record_id(mut self, record_id: i64) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: SqlValue) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn add_payload(&mut self, key: impl Into<String>, value: SqlValue) {
        self.payload.insert(key.into(), value);
    }

    /// Two-part identifier, e.g. `accounts-added`
    pub fn name(&self) -> String {
        format!("{}-{}", self.table_name, self.event_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        assert_eq!(
            DatabaseEvent::new(EventType::Added, "accounts").name(),
            "accounts-added"
        );
        assert_eq!(
            DatabaseEvent::new(EventType::Changed, "accounts_tags").name(),
            "accounts_tags-changed"
        );
    }

    #[test]
    fn test_builder_methods() {
        let event = DatabaseEvent::new(EventType::Deleted, "accounts")
            .with_record_id(9)
            .with_payload("name", SqlValue::from("Alice"));
        assert_eq!(event.record_id, Some(9));
        assert_eq!(event.payload.get("name"), Some(&SqlValue::from("Alice")));
    }
}
