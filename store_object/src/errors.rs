use crate::validation::ValidationError;
use thiserror::Error;

/// Rejection of a candidate value by a field
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Field '{field}' cannot be NULL")]
    NotNullable { field: String },

    #[error("Field '{field}' cannot be changed once set")]
    Immutable { field: String },

    #[error("Value {value} of field '{field}' is out of required range: (min){min} - (max){max}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Length {length} of field '{field}' is out of required range: (min){min} - (max){max}")]
    LengthOutOfRange {
        field: String,
        length: i64,
        min: i64,
        max: i64,
    },

    #[error("Value of field '{field}' does not match pattern '{pattern}'")]
    PatternMismatch { field: String, pattern: String },

    #[error("Datetime {value} of field '{field}' is out of required range: (low){low} - (high){high}")]
    DatetimeOutOfRange {
        field: String,
        value: String,
        low: String,
        high: String,
    },

    #[error("Value '{value}' of field '{field}' is not a valid datetime")]
    InvalidDatetime { field: String, value: String },

    #[error("Value of field '{field}' failed its custom check")]
    CustomCheck { field: String },

    #[error("Field '{field}' expects a {expected} value, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Accessing a non-initialized value: '{field}'")]
    NotInitialized { field: String },
}

/// Broad classification of [`StorehausError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Connection,
    Transaction,
    Query,
    Aggregate,
}

#[derive(Error, Debug)]
pub enum StorehausError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Field '{field}' does not exist in table '{table}'")]
    MissingField { table: String, field: String },

    #[error("Category '{category}' is not declared for '{table}'")]
    UnknownCategory { table: String, category: String },

    #[error("Invalid identifier: {0}")]
    Identifier(#[from] ValidationError),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No connection to the database")]
    NotConnected,

    #[error("Failed to connect to the database: {0}")]
    ConnectFailed(String),

    #[error("Statement timed out after {seconds}s: {sql}")]
    Timeout { sql: String, seconds: u64 },

    #[error("A transaction is already open")]
    TransactionActive,

    #[error("No transaction is open")]
    NoTransaction,

    #[error("Query failed: {message} (SQL: {sql})")]
    QueryFailed { sql: String, message: String },

    #[error("Statement #{index} of batch failed: {source}")]
    MultiQueryFailed {
        index: usize,
        #[source]
        source: Box<StorehausError>,
    },

    #[error("Database reported no generated id for insert into '{table}'")]
    MissingInsertId { table: String },

    #[error("Record in '{table}' is not persisted")]
    NotPersisted { table: String },

    #[error("Nothing to update in '{table}': no field was assigned")]
    EmptyUpdate { table: String },

    #[error("Record group has no main record bound")]
    MissingMainRecord,

    #[error("Write of '{category}' sub-record #{index} failed: {source}")]
    SubRecordFailed {
        category: String,
        index: usize,
        #[source]
        source: Box<StorehausError>,
    },
}

impl StorehausError {
    pub fn query_failed(sql: &str, message: impl std::fmt::Display) -> Self {
        Self::QueryFailed {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }

    pub fn missing_field(table: &str, field: &str) -> Self {
        Self::MissingField {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Field(_)
            | Self::MissingField { .. }
            | Self::UnknownCategory { .. }
            | Self::Identifier(_)
            | Self::InvalidSchema(_)
            | Self::InvalidInput(_)
            | Self::EmptyUpdate { .. } => ErrorKind::Validation,
            Self::NotConnected | Self::ConnectFailed(_) | Self::Timeout { .. } => {
                ErrorKind::Connection
            }
            Self::TransactionActive | Self::NoTransaction => ErrorKind::Transaction,
            Self::QueryFailed { .. }
            | Self::MultiQueryFailed { .. }
            | Self::MissingInsertId { .. }
            | Self::NotPersisted { .. } => ErrorKind::Query,
            Self::MissingMainRecord | Self::SubRecordFailed { .. } => ErrorKind::Aggregate,
        }
    }

    /// Stable error number reported to clients
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 1,
            Self::Field(e) => match e {
                FieldError::NotInitialized { .. } => 2,
                FieldError::Immutable { .. } => 4,
                FieldError::NotNullable { .. } => 5,
                FieldError::CustomCheck { .. } => 6,
                FieldError::OutOfRange { .. }
                | FieldError::LengthOutOfRange { .. }
                | FieldError::DatetimeOutOfRange { .. } => 7,
                FieldError::PatternMismatch { .. } => 8,
                FieldError::TypeMismatch { .. } => 9,
                FieldError::InvalidDatetime { .. } => 10,
            },
            Self::MissingField { .. } => 3,
            Self::UnknownCategory { .. } => 11,
            Self::Identifier(_) | Self::InvalidSchema(_) => 12,
            Self::EmptyUpdate { .. } => 13,
            Self::NotConnected => 20,
            Self::ConnectFailed(_) => 21,
            Self::Timeout { .. } => 22,
            Self::TransactionActive => 30,
            Self::NoTransaction => 31,
            Self::QueryFailed { .. } => 40,
            Self::MultiQueryFailed { .. } => 41,
            Self::MissingInsertId { .. } => 42,
            Self::NotPersisted { .. } => 43,
            Self::MissingMainRecord => 50,
            Self::SubRecordFailed { .. } => 51,
        }
    }
}
