//! Error types for the RecordHaus crate
//!
//! This module contains all error types that can be returned by RecordHaus operations.

use config::ConfigError;
use store_object::StorehausError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordHausError {
    #[error(transparent)]
    Store(#[from] StorehausError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Group '{0}' cannot be mapped")]
    UnknownGroup(String),

    #[error("Group already registered: {0}")]
    GroupAlreadyRegistered(String),

    #[error("Malformed request: {0}")]
    RequestFormat(String),
}

impl RecordHausError {
    /// Stable error number reported in the response envelope
    pub fn code(&self) -> u16 {
        match self {
            Self::Store(e) => e.code(),
            Self::UnknownGroup(_) => 60,
            Self::RequestFormat(_) => 61,
            Self::GroupAlreadyRegistered(_) => 62,
            Self::Config(_) => 70,
        }
    }
}
