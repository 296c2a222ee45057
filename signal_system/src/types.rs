//! Type definitions for signal system

use crate::event::DatabaseEvent;

// Re-export from type-mapping for convenience
pub use type_mapping::SqlValue;

/// Event callback invoked synchronously for every emitted event
pub type EventCallback = Box<dyn Fn(&DatabaseEvent) + Send + Sync>;
