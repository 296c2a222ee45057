//! Database connection collaborator
//!
//! Records and groups talk to storage only through [`Connection`]; the
//! production implementation is [`SqlxConnection`].

pub mod sqlx_conn;
pub mod transaction;

use crate::errors::StorehausError;
use async_trait::async_trait;
use std::collections::HashMap;
use type_mapping::{Dialect, SqlValue};

pub use sqlx_conn::SqlxConnection;
pub use transaction::Transaction;

/// One result row, keyed by column label
pub type Row = HashMap<String, SqlValue>;

/// A single database session.
///
/// At most one transaction is open at a time: `begin_transaction` while one
/// is open fails with `TransactionActive`, `commit`/`rollback` without one
/// fail with `NoTransaction`.
#[async_trait]
pub trait Connection: Send {
    /// Run a statement returning rows
    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, StorehausError>;

    /// Run a statement and return the number of affected rows
    async fn execute(&mut self, sql: &str) -> Result<u64, StorehausError>;

    async fn begin_transaction(&mut self) -> Result<(), StorehausError>;

    async fn commit(&mut self) -> Result<(), StorehausError>;

    async fn rollback(&mut self) -> Result<(), StorehausError>;

    /// Id generated by the last successful INSERT, when the driver reports one
    fn last_insert_id(&self) -> Option<i64>;

    fn in_transaction(&self) -> bool;

    /// How string literals must be written for this backend
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    /// Run several statements as one transaction.
    ///
    /// The first failing statement rolls everything back and is reported
    /// with its position.
    async fn execute_batch(&mut self, statements: &[String]) -> Result<(), StorehausError> {
        self.begin_transaction().await?;
        for (index, sql) in statements.iter().enumerate() {
            if let Err(e) = self.execute(sql).await {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback after failed batch failed");
                }
                return Err(StorehausError::MultiQueryFailed {
                    index,
                    source: Box::new(e),
                });
            }
        }
        self.commit().await
    }
}
