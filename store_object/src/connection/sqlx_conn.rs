//! [`Connection`] over a single sqlx `AnyConnection`

use super::{Connection, Row};
use crate::errors::StorehausError;
use async_trait::async_trait;
use config::DatabaseConfig;
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Column, Row as _};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use type_mapping::{Dialect, SqlValue};

/// Database session backed by sqlx.
///
/// Works with MySQL and SQLite URLs; literals are rendered for the backend
/// actually connected. Statements go through the prepared-statement path
/// without being cached, so MySQL refuses stacked statements. Every
/// statement is bounded by the statement timeout. A failed BEGIN/COMMIT/ROLLBACK or a timeout
/// leaves the session in an unknown state, so it is marked lost and every
/// later call fails with `NotConnected`.
pub struct SqlxConnection {
    conn: AnyConnection,
    statement_timeout: Duration,
    in_transaction: bool,
    lost: bool,
    last_insert_id: Option<i64>,
    dialect: Dialect,
}

impl std::fmt::Debug for SqlxConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxConnection")
            .field("statement_timeout", &self.statement_timeout)
            .field("in_transaction", &self.in_transaction)
            .field("lost", &self.lost)
            .field("dialect", &self.dialect)
            .finish()
    }
}

impl SqlxConnection {
    /// Open a connection as described by `config`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorehausError> {
        sqlx::any::install_default_drivers();

        let connect = <AnyConnection as sqlx::Connection>::connect(&config.url);
        let conn = match tokio::time::timeout(config.connect_timeout(), connect).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(StorehausError::ConnectFailed(e.to_string())),
            Err(_) => {
                return Err(StorehausError::ConnectFailed(format!(
                    "timed out after {}s",
                    config.connect_timeout_seconds
                )))
            }
        };

        tracing::debug!(backend = conn.backend_name(), "database connection established");
        Self::from_connection(conn, config.statement_timeout())
    }

    /// Wrap an already open connection; only MySQL and SQLite backends are
    /// accepted
    pub fn from_connection(
        conn: AnyConnection,
        statement_timeout: Duration,
    ) -> Result<Self, StorehausError> {
        let dialect = Dialect::from_backend_name(conn.backend_name()).ok_or_else(|| {
            StorehausError::ConnectFailed(format!(
                "unsupported backend '{}'",
                conn.backend_name()
            ))
        })?;
        Ok(Self {
            conn,
            statement_timeout,
            in_transaction: false,
            lost: false,
            last_insert_id: None,
            dialect,
        })
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub async fn close(self) -> Result<(), StorehausError> {
        <AnyConnection as sqlx::Connection>::close(self.conn)
            .await
            .map_err(|e| StorehausError::ConnectFailed(e.to_string()))
    }

    fn ensure_usable(&self) -> Result<(), StorehausError> {
        if self.lost {
            return Err(StorehausError::NotConnected);
        }
        Ok(())
    }

    async fn control(&mut self, sql: &str) -> Result<(), StorehausError> {
        self.ensure_usable()?;
        let timeout = self.statement_timeout;
        let conn: &mut AnyConnection = &mut self.conn;
        // BEGIN cannot be prepared on MySQL; these are fixed strings
        let result = bounded(timeout, sql, sqlx::Executor::execute(conn, sqlx::raw_sql(sql))).await;
        if let Err(e) = result {
            tracing::error!(sql, error = %e, "transaction control statement failed, connection lost");
            self.lost = true;
            self.in_transaction = false;
            return Err(e);
        }
        Ok(())
    }

    fn note_failure(&mut self, error: &StorehausError) {
        if matches!(error, StorehausError::Timeout { .. }) {
            self.lost = true;
        }
    }
}

/// Await `fut` for at most `timeout`
async fn bounded<T, F>(timeout: Duration, sql: &str, fut: F) -> Result<T, StorehausError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StorehausError::query_failed(sql, e)),
        Err(_) => Err(StorehausError::Timeout {
            sql: sql.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

fn decode_value(row: &AnyRow, index: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(SqlValue::Null, SqlValue::Integer);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(SqlValue::Null, SqlValue::Text);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map_or(SqlValue::Null, SqlValue::Boolean);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v.map_or(SqlValue::Null, |n| SqlValue::Integer(i64::from(n)));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(SqlValue::Null, |n| SqlValue::Text(n.to_string()));
    }
    tracing::warn!(column = index, "undecodable column value, reading as NULL");
    SqlValue::Null
}

fn decode_row(row: &AnyRow) -> Row {
    let mut decoded = HashMap::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        decoded.insert(column.name().to_string(), decode_value(row, index));
    }
    decoded
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, StorehausError> {
        self.ensure_usable()?;
        tracing::debug!(sql, "fetch");
        let timeout = self.statement_timeout;
        let conn: &mut AnyConnection = &mut self.conn;
        let query = sqlx::query(sql).persistent(false);
        let result = bounded(timeout, sql, query.fetch_all(conn)).await;
        match result {
            Ok(rows) => Ok(rows.iter().map(decode_row).collect()),
            Err(e) => {
                self.note_failure(&e);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, StorehausError> {
        self.ensure_usable()?;
        tracing::debug!(sql, "execute");
        let timeout = self.statement_timeout;
        let conn: &mut AnyConnection = &mut self.conn;
        let query = sqlx::query(sql).persistent(false);
        let result = bounded(timeout, sql, query.execute(conn)).await;
        match result {
            Ok(done) => {
                self.last_insert_id = done.last_insert_id();
                Ok(done.rows_affected())
            }
            Err(e) => {
                self.note_failure(&e);
                Err(e)
            }
        }
    }

    async fn begin_transaction(&mut self) -> Result<(), StorehausError> {
        self.ensure_usable()?;
        if self.in_transaction {
            return Err(StorehausError::TransactionActive);
        }
        self.control("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorehausError> {
        self.ensure_usable()?;
        if !self.in_transaction {
            return Err(StorehausError::NoTransaction);
        }
        self.control("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorehausError> {
        self.ensure_usable()?;
        if !self.in_transaction {
            return Err(StorehausError::NoTransaction);
        }
        self.control("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
