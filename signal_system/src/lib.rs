//! Signal system for database event handling
//!
//! This crate informs interested parties after records were written
//! in the recordhaus ecosystem.

pub mod event;
pub mod manager;
pub mod types;

pub use event::{DatabaseEvent, EventType};
pub use manager::SignalManager;
pub use types::{EventCallback, SqlValue};
