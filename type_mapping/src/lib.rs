//! Unified type mapping between Rust values and SQL text
//! This crate provides the value model and literal rendering used across the recordhaus ecosystem

pub mod serialize;
pub mod sql;
pub mod types;
pub mod validate;

// Re-export commonly used items
pub use serialize::{json_object_to_row, row_to_json};
pub use sql::{escape_like_pattern, escape_string, quote_identifier, quote_string, Dialect};
pub use types::SqlValue;
pub use validate::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
