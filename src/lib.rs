//! # RecordHaus
//!
//! A record/field mapping layer for relational databases: validated fields,
//! single-table records, transactional multi-table record groups, change
//! signals and a request coordinator.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recordhaus::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new("mysql://root@localhost/recordhaus".to_string(), 5, 30);
//!     let mut haus = RecordHaus::connect(&config).await?;
//!
//!     let accounts = RecordSchema::builder("accounts")
//!         .field(FieldSpec::string("name").length(1, 45))
//!         .build()?;
//!     let tags = RecordSchema::builder("accounts_tags")
//!         .field(FieldSpec::numeric("account_id"))
//!         .field(FieldSpec::string("tag"))
//!         .build()?;
//!     let group = GroupSchema::builder(accounts)
//!         .category("tags", tags, "account_id")
//!         .build()?;
//!     haus.register_group("accounts", group)?;
//!
//!     haus.signals().add_callback(|event| println!("{}", event.name()));
//!
//!     let request = Request::new("accounts", Action::Add).with_data(json!({
//!         "main": {"name": "Alice"},
//!         "tags": [{"tag": "vip"}]
//!     }));
//!     let response = haus.handle(&request).await;
//!     println!("{}", response.to_json());
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;
pub mod request;

// Re-export the main public types for convenience
pub use crate::core::RecordHaus;
pub use errors::RecordHausError;
pub use request::{Action, Request, Response};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, FieldDefaults};

// Re-export internal crates
pub use signal_system;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
