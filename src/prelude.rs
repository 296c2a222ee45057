//! Convenience re-exports for common RecordHaus usage
//!
//! # Example
//!
//! ```rust
//! use recordhaus::prelude::*;
//!
//! let schema = RecordSchema::builder("accounts")
//!     .field(FieldSpec::string("name"))
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.table_name(), "accounts");
//! ```

// Core RecordHaus components
pub use crate::core::RecordHaus;
pub use crate::errors::RecordHausError;
pub use crate::request::{Action, Request, Response};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, FieldDefaults};

// Records, groups, queries and connections
pub use store_object::prelude::*;

// Common external dependencies
pub use async_trait;
pub use sqlx;
pub use tokio;
