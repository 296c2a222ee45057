//! Scripted in-memory connection for tests

use crate::connection::{Connection, Row};
use crate::errors::StorehausError;
use async_trait::async_trait;
use type_mapping::Dialect;

/// A [`Connection`] that records statements instead of running them.
///
/// Fetches are answered by the first rule whose pattern is contained in the
/// statement. Statements executed inside a transaction only reach
/// `committed()` once the transaction commits; a rollback discards them.
#[derive(Debug, Default)]
pub struct MockConnection {
    statements: Vec<String>,
    committed: Vec<String>,
    pending: Vec<String>,
    fetch_rules: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    next_insert_id: i64,
    last_insert_id: Option<i64>,
    report_insert_ids: bool,
    in_transaction: bool,
    dialect: Dialect,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            next_insert_id: 1,
            report_insert_ids: true,
            ..Default::default()
        }
    }

    /// Render literals as `dialect` would need them
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Answer fetches containing `pattern` with `rows`
    pub fn on_fetch(&mut self, pattern: &str, rows: Vec<Row>) -> &mut Self {
        self.fetch_rules.push((pattern.to_string(), rows));
        self
    }

    /// Fail every statement containing `pattern`
    pub fn fail_when(&mut self, pattern: &str) -> &mut Self {
        self.failures.push(pattern.to_string());
        self
    }

    /// Id handed out by the next INSERT
    pub fn set_next_insert_id(&mut self, id: i64) -> &mut Self {
        self.next_insert_id = id;
        self
    }

    /// Behave like a driver that cannot report generated ids
    pub fn without_insert_ids(&mut self) -> &mut Self {
        self.report_insert_ids = false;
        self
    }

    /// Every statement received, including failed ones and transaction control
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Writes that took effect
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    fn record(&mut self, sql: &str) -> Result<(), StorehausError> {
        self.statements.push(sql.to_string());
        if self.failures.iter().any(|p| sql.contains(p.as_str())) {
            return Err(StorehausError::query_failed(sql, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, StorehausError> {
        self.record(sql)?;
        Ok(self
            .fetch_rules
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, StorehausError> {
        self.record(sql)?;
        if sql.starts_with("INSERT") {
            self.last_insert_id = if self.report_insert_ids {
                Some(self.next_insert_id)
            } else {
                None
            };
            self.next_insert_id += 1;
        }
        if self.in_transaction {
            self.pending.push(sql.to_string());
        } else {
            self.committed.push(sql.to_string());
        }
        Ok(1)
    }

    async fn begin_transaction(&mut self) -> Result<(), StorehausError> {
        if self.in_transaction {
            return Err(StorehausError::TransactionActive);
        }
        self.record("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorehausError> {
        if !self.in_transaction {
            return Err(StorehausError::NoTransaction);
        }
        self.record("COMMIT")?;
        self.in_transaction = false;
        self.committed.append(&mut self.pending);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorehausError> {
        if !self.in_transaction {
            return Err(StorehausError::NoTransaction);
        }
        self.record("ROLLBACK")?;
        self.in_transaction = false;
        self.pending.clear();
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
