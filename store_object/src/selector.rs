//! Read path for single-table records

use crate::connection::{Connection, Row};
use crate::errors::StorehausError;
use crate::query_builder::{QueryBuilder, QueryFilter};
use crate::record::Record;
use crate::schema::{RecordSchema, PRIMARY_KEY};
use std::sync::Arc;
use type_mapping::quote_identifier;

/// Builds `SELECT` statements for one table and turns rows into records
#[derive(Debug, Clone)]
pub struct Selector {
    schema: Arc<RecordSchema>,
}

impl Selector {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// `SELECT <columns> FROM <table> [WHERE <where_clause>]`
    pub fn select_sql(&self, where_clause: &str) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.schema.select_columns(),
            quote_identifier(self.schema.table_name())
        );
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        sql
    }

    /// Rows matching a raw condition; an empty condition selects everything
    pub async fn select(
        &self,
        conn: &mut dyn Connection,
        where_clause: &str,
    ) -> Result<Vec<Record>, StorehausError> {
        let sql = self.select_sql(where_clause);
        let rows = conn.fetch(&sql).await?;
        self.materialize(&rows)
    }

    /// Rows matching a composed query
    pub async fn find(
        &self,
        conn: &mut dyn Connection,
        query: &QueryBuilder,
    ) -> Result<Vec<Record>, StorehausError> {
        let mut sql = self.select_sql(&query.build_where_condition_for(conn.dialect()));
        for clause in [query.build_order_clause(), query.build_limit_clause()] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(&clause);
            }
        }
        let rows = conn.fetch(&sql).await?;
        self.materialize(&rows)
    }

    pub async fn find_by_id(
        &self,
        conn: &mut dyn Connection,
        id: i64,
    ) -> Result<Option<Record>, StorehausError> {
        let column = format!("{}.{}", self.schema.table_name(), PRIMARY_KEY);
        let query = QueryBuilder::new().filter(QueryFilter::eq(&column, id));
        Ok(self.find(conn, &query).await?.into_iter().next())
    }

    /// Every row becomes a record marked as existing; one bad row fails the
    /// whole batch
    pub fn materialize(&self, rows: &[Row]) -> Result<Vec<Record>, StorehausError> {
        rows.iter()
            .map(|row| {
                let mut record = Record::new(Arc::clone(&self.schema));
                record.fill_data(row, true)?;
                Ok(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::query_builder::SortOrder;
    use crate::testing::MockConnection;
    use type_mapping::SqlValue;

    fn selector() -> Selector {
        Selector::new(
            RecordSchema::builder("accounts")
                .field(FieldSpec::string("name"))
                .build()
                .unwrap(),
        )
    }

    fn account(id: i64, name: &str) -> Row {
        Row::from([
            ("id".to_string(), SqlValue::Integer(id)),
            ("name".to_string(), SqlValue::from(name)),
        ])
    }

    #[test]
    fn test_select_sql() {
        let selector = selector();
        assert_eq!(
            selector.select_sql(""),
            "SELECT `accounts`.`id` AS `id`, `accounts`.`name` AS `name` FROM `accounts`"
        );
        assert!(selector.select_sql("`name` = 'x'").ends_with(" WHERE `name` = 'x'"));
    }

    #[tokio::test]
    async fn test_select_materializes_existing_records() {
        let mut conn = MockConnection::new();
        conn.on_fetch("FROM `accounts`", vec![account(1, "Alice"), account(2, "Bob")]);

        let records = selector().select(&mut conn, "").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(Record::exists));
        assert_eq!(records[1].get_field("name").unwrap(), &SqlValue::from("Bob"));
    }

    #[tokio::test]
    async fn test_select_failure_is_an_error() {
        let mut conn = MockConnection::new();
        conn.fail_when("SELECT");
        let result = selector().select(&mut conn, "").await;
        assert!(matches!(result, Err(StorehausError::QueryFailed { .. })));
    }

    #[tokio::test]
    async fn test_find_appends_order_and_limit() {
        let mut conn = MockConnection::new();
        let query = QueryBuilder::new()
            .filter(QueryFilter::like("name", "A%"))
            .order_by("name", SortOrder::Asc)
            .limit(5);

        let records = selector().find(&mut conn, &query).await.unwrap();
        assert!(records.is_empty());
        assert!(conn.statements()[0]
            .ends_with("WHERE `name` LIKE 'A%' ORDER BY `name` ASC LIMIT 5"));
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let mut conn = MockConnection::new();
        conn.on_fetch("`accounts`.`id` = 7", vec![account(7, "Grace")]);

        let found = selector().find_by_id(&mut conn, 7).await.unwrap();
        assert_eq!(found.and_then(|r| r.id()), Some(7));
        let missing = selector().find_by_id(&mut conn, 8).await.unwrap();
        assert!(missing.is_none());
    }
}
