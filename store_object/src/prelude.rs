//! Convenience re-exports for common store-object usage

// Schema declaration
pub use crate::field::{FieldFactory, FieldSpec};
pub use crate::schema::{GroupSchema, RecordSchema};

// Records and their read paths
pub use crate::group_selector::RecordGroupSelector;
pub use crate::record::Record;
pub use crate::record_group::RecordGroup;
pub use crate::selector::Selector;

// Connection
pub use crate::connection::{Connection, Row, SqlxConnection};

// Error types
pub use crate::errors::{FieldError, StorehausError};

// Query building
pub use crate::query_builder::{QueryBuilder, QueryFilter, SortOrder};

// Values and events
pub use signal_system::{DatabaseEvent, EventType, SignalManager};
pub use type_mapping::{Dialect, SqlValue};

pub use async_trait::async_trait;
