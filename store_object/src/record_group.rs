//! Aggregates of one main record and its dependent sub-records

use crate::connection::{Connection, Row, Transaction};
use crate::errors::StorehausError;
use crate::query_builder::QueryBuilder;
use crate::record::{input_row, Record};
use crate::schema::{GroupSchema, RecordSchema, MAIN_KEY, PRIMARY_KEY};
use crate::selector::Selector;
use signal_system::SignalManager;
use std::collections::HashMap;
use std::sync::Arc;
use type_mapping::{quote_identifier, SqlValue};

/// Raw rows of one aggregate: the main row plus rows per category
#[derive(Debug, Clone, Default)]
pub struct GroupRows {
    pub main: Row,
    pub categories: HashMap<String, Vec<Row>>,
}

/// One main record with its sub-records, written as a single transaction.
///
/// Every declared category is always present, possibly empty.
#[derive(Debug, Clone)]
pub struct RecordGroup {
    schema: Arc<GroupSchema>,
    main: Option<Record>,
    sub_records: Vec<Vec<Record>>,
}

impl RecordGroup {
    pub fn new(schema: Arc<GroupSchema>) -> Self {
        let sub_records = vec![Vec::new(); schema.categories().len()];
        Self {
            schema,
            main: None,
            sub_records,
        }
    }

    pub fn schema(&self) -> &Arc<GroupSchema> {
        &self.schema
    }

    pub fn main(&self) -> Option<&Record> {
        self.main.as_ref()
    }

    pub fn main_mut(&mut self) -> Option<&mut Record> {
        self.main.as_mut()
    }

    /// Bind an already built main record
    pub fn set_main(&mut self, record: Record) -> Result<(), StorehausError> {
        if !Arc::ptr_eq(record.schema(), self.schema.main()) {
            return Err(StorehausError::InvalidInput(format!(
                "record of '{}' cannot be the main record of '{}'",
                record.table_name(),
                self.schema.main().table_name()
            )));
        }
        self.main = Some(record);
        Ok(())
    }

    /// Replace the main record with one built from `data`
    pub fn fill_main(&mut self, data: &Row, exists: bool) -> Result<(), StorehausError> {
        let mut record = Record::new(Arc::clone(self.schema.main()));
        record.fill_data(data, exists)?;
        self.main = Some(record);
        Ok(())
    }

    fn category_index(&self, category: &str) -> Result<usize, StorehausError> {
        self.schema
            .category_position(category)
            .ok_or_else(|| StorehausError::UnknownCategory {
                table: self.schema.main().table_name().to_string(),
                category: category.to_string(),
            })
    }

    fn build_records(
        schema: &Arc<RecordSchema>,
        rows: &[Row],
        exists: bool,
    ) -> Result<Vec<Record>, StorehausError> {
        rows.iter()
            .map(|row| {
                let mut record = Record::new(Arc::clone(schema));
                record.fill_data(row, exists)?;
                Ok(record)
            })
            .collect()
    }

    /// Replace the whole aggregate; nothing changes if any row is rejected
    pub fn fill_data(&mut self, rows: &GroupRows, exists: bool) -> Result<(), StorehausError> {
        let mut main = Record::new(Arc::clone(self.schema.main()));
        main.fill_data(&rows.main, exists)?;

        let mut sub_records = vec![Vec::new(); self.schema.categories().len()];
        for (category, category_rows) in &rows.categories {
            let index = self.category_index(category)?;
            let schema = &self.schema.categories()[index].schema;
            sub_records[index] = Self::build_records(schema, category_rows, exists)?;
        }

        self.main = Some(main);
        self.sub_records = sub_records;
        Ok(())
    }

    /// Append sub-records built from `rows` to `category`
    pub fn append_data(
        &mut self,
        category: &str,
        rows: &[Row],
        exists: bool,
    ) -> Result<(), StorehausError> {
        let index = self.category_index(category)?;
        let records = Self::build_records(&self.schema.categories()[index].schema, rows, exists)?;
        self.sub_records[index].extend(records);
        Ok(())
    }

    /// Empty record of the category's table, not yet part of the group
    pub fn new_sub_record(&self, category: &str) -> Result<Record, StorehausError> {
        let index = self.category_index(category)?;
        Ok(Record::new(Arc::clone(&self.schema.categories()[index].schema)))
    }

    pub fn add_sub_record(&mut self, category: &str, record: Record) -> Result<(), StorehausError> {
        let index = self.category_index(category)?;
        if !Arc::ptr_eq(record.schema(), &self.schema.categories()[index].schema) {
            return Err(StorehausError::InvalidInput(format!(
                "record of '{}' does not belong to category '{}'",
                record.table_name(),
                category
            )));
        }
        self.sub_records[index].push(record);
        Ok(())
    }

    pub fn sub_records(&self, category: &str) -> Result<&[Record], StorehausError> {
        let index = self.category_index(category)?;
        Ok(&self.sub_records[index])
    }

    pub fn sub_records_mut(&mut self, category: &str) -> Result<&mut Vec<Record>, StorehausError> {
        let index = self.category_index(category)?;
        Ok(&mut self.sub_records[index])
    }

    /// Fill from client input shaped `{"main": {...}, "<category>": [{...}]}`.
    ///
    /// Sub-rows count as existing only when `exists` is set and they carry
    /// an `id`.
    pub fn fill_input_data(
        &mut self,
        input: &serde_json::Value,
        exists: bool,
    ) -> Result<(), StorehausError> {
        let object = input.as_object().ok_or_else(|| {
            StorehausError::InvalidInput("group input must be a JSON object".to_string())
        })?;
        let main_input = object
            .get(MAIN_KEY)
            .ok_or_else(|| StorehausError::InvalidInput("group input lacks 'main'".to_string()))?;

        let mut main = Record::new(Arc::clone(self.schema.main()));
        main.fill_input_data(main_input, exists)?;

        let mut sub_records = vec![Vec::new(); self.schema.categories().len()];
        for (key, value) in object.iter().filter(|(k, _)| k.as_str() != MAIN_KEY) {
            let index = self.category_index(key)?;
            let items = value.as_array().ok_or_else(|| {
                StorehausError::InvalidInput(format!("category '{}' must be a JSON array", key))
            })?;
            let schema = &self.schema.categories()[index].schema;
            for item in items {
                let row = input_row(item, key)?;
                let sub_exists = exists && row.contains_key(PRIMARY_KEY);
                let mut record = Record::new(Arc::clone(schema));
                record.fill_data(&row, sub_exists)?;
                sub_records[index].push(record);
            }
        }

        self.main = Some(main);
        self.sub_records = sub_records;
        Ok(())
    }

    /// Write the main record and every sub-record in one transaction.
    ///
    /// Sub-records without a foreign key get the main record's id. On any
    /// failure the transaction is rolled back, the group is restored to its
    /// previous state and the original error is returned. Events are
    /// emitted only after COMMIT.
    pub async fn update(
        &mut self,
        conn: &mut dyn Connection,
        signals: Option<&SignalManager>,
    ) -> Result<(), StorehausError> {
        if self.main.is_none() {
            return Err(StorehausError::MissingMainRecord);
        }

        let snapshot = self.clone();
        let mut tx = Transaction::begin(conn).await?;

        let written = self.write_all(tx.as_mut()).await;
        let events = match written {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    table = self.schema.main().table_name(),
                    error = %e,
                    "group write failed, rolling back"
                );
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                *self = snapshot;
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            *self = snapshot;
            return Err(e);
        }

        if let Some(signals) = signals {
            signals.emit_all(events);
        }
        Ok(())
    }

    async fn write_all(
        &mut self,
        conn: &mut dyn Connection,
    ) -> Result<Vec<signal_system::DatabaseEvent>, StorehausError> {
        let main = self.main.as_mut().ok_or(StorehausError::MissingMainRecord)?;
        let mut events = vec![main.persist(conn).await?];
        let main_id = main.id().ok_or_else(|| StorehausError::MissingInsertId {
            table: main.table_name().to_string(),
        })?;

        for (category, records) in self.schema.categories().iter().zip(self.sub_records.iter_mut()) {
            for (index, record) in records.iter_mut().enumerate() {
                let linked = record
                    .field(&category.foreign_key)
                    .map_or(false, |f| f.is_initialized());
                let written = if linked {
                    record.persist(&mut *conn).await
                } else {
                    match record.set_field(&category.foreign_key, main_id) {
                        Ok(()) => record.persist(&mut *conn).await,
                        Err(e) => Err(e),
                    }
                };

                match written {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        return Err(StorehausError::SubRecordFailed {
                            category: category.name.clone(),
                            index,
                            source: Box::new(e),
                        })
                    }
                }
            }
        }
        Ok(events)
    }

    /// Delete the main record. Dependents are left to the storage layer.
    pub async fn delete(
        &mut self,
        conn: &mut dyn Connection,
        signals: Option<&SignalManager>,
    ) -> Result<bool, StorehausError> {
        let main = self.main.as_mut().ok_or(StorehausError::MissingMainRecord)?;
        main.delete(conn, signals).await
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            MAIN_KEY.to_string(),
            self.main
                .as_ref()
                .map_or(serde_json::Value::Null, Record::to_json),
        );
        for (category, records) in self.schema.categories().iter().zip(&self.sub_records) {
            map.insert(
                category.name.clone(),
                serde_json::Value::Array(records.iter().map(Record::to_json).collect()),
            );
        }
        serde_json::Value::Object(map)
    }

    fn distinct_ids_sql(schema: &GroupSchema, where_clause: &str, limit_clause: &str) -> String {
        let id_column = schema.main().qualified(PRIMARY_KEY);
        let mut sql = format!(
            "SELECT DISTINCT {} AS {} FROM {}",
            id_column,
            quote_identifier(PRIMARY_KEY),
            schema.join_clause()
        );
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&id_column);
        if !limit_clause.is_empty() {
            sql.push(' ');
            sql.push_str(limit_clause);
        }
        sql
    }

    /// Aggregates whose joined rows satisfy `where_clause`.
    ///
    /// Matching main ids are found with one DISTINCT query over the join,
    /// then every aggregate is loaded table by table.
    pub async fn select(
        schema: &Arc<GroupSchema>,
        conn: &mut dyn Connection,
        where_clause: &str,
    ) -> Result<Vec<RecordGroup>, StorehausError> {
        let sql = Self::distinct_ids_sql(schema, where_clause, "");
        Self::load(schema, conn, &sql).await
    }

    /// Like [`RecordGroup::select`] with a composed query. Results are always
    /// ordered by main id; limit and offset count aggregates.
    pub async fn find(
        schema: &Arc<GroupSchema>,
        conn: &mut dyn Connection,
        query: &QueryBuilder,
    ) -> Result<Vec<RecordGroup>, StorehausError> {
        let sql = Self::distinct_ids_sql(
            schema,
            &query.build_where_condition_for(conn.dialect()),
            &query.build_limit_clause(),
        );
        Self::load(schema, conn, &sql).await
    }

    async fn load(
        schema: &Arc<GroupSchema>,
        conn: &mut dyn Connection,
        ids_sql: &str,
    ) -> Result<Vec<RecordGroup>, StorehausError> {
        let mut ids = Vec::new();
        for row in conn.fetch(ids_sql).await? {
            match row.get(PRIMARY_KEY).and_then(SqlValue::as_i64) {
                Some(id) => ids.push(id),
                None => {
                    return Err(StorehausError::query_failed(
                        ids_sql,
                        "result row without an integer id",
                    ))
                }
            }
        }

        let main_selector = Selector::new(Arc::clone(schema.main()));
        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
            let condition = format!("{} = {}", schema.main().qualified(PRIMARY_KEY), id);
            let main = match main_selector.select(&mut *conn, &condition).await?.pop() {
                Some(main) => main,
                None => {
                    tracing::warn!(table = schema.main().table_name(), id, "main row vanished during select");
                    continue;
                }
            };

            let mut group = RecordGroup::new(Arc::clone(schema));
            group.main = Some(main);
            for (index, category) in schema.categories().iter().enumerate() {
                let selector = Selector::new(Arc::clone(&category.schema));
                let sql = format!(
                    "{} ORDER BY {}",
                    selector.select_sql(&format!(
                        "{} = {}",
                        category.schema.qualified(&category.foreign_key),
                        id
                    )),
                    category.schema.qualified(PRIMARY_KEY)
                );
                let rows = conn.fetch(&sql).await?;
                group.sub_records[index] = selector.materialize(&rows)?;
            }
            groups.push(group);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::query_builder::QueryFilter;
    use crate::testing::MockConnection;
    use serde_json::json;
    use std::sync::Mutex;

    fn schema() -> Arc<GroupSchema> {
        let accounts = RecordSchema::builder("accounts")
            .field(FieldSpec::string("name"))
            .build()
            .unwrap();
        let items = RecordSchema::builder("items")
            .field(FieldSpec::numeric("account_id"))
            .field(FieldSpec::string("label").length(1, 10))
            .build()
            .unwrap();
        GroupSchema::builder(accounts)
            .category("items", items, "account_id")
            .build()
            .unwrap()
    }

    fn row(pairs: &[(&str, SqlValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_update_without_main_fails() {
        let mut conn = MockConnection::new();
        let mut group = RecordGroup::new(schema());
        let err = group.update(&mut conn, None).await.unwrap_err();
        assert!(matches!(err, StorehausError::MissingMainRecord));
        assert!(conn.statements().is_empty());
    }

    #[tokio::test]
    async fn test_new_aggregate_links_sub_records() {
        let mut conn = MockConnection::new();
        conn.set_next_insert_id(10);
        let signals = SignalManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        signals.add_callback(move |e| sink.lock().unwrap().push(e.name()));

        let mut group = RecordGroup::new(schema());
        group
            .fill_input_data(
                &json!({"main": {"name": "Alice"}, "items": [{"label": "a"}, {"label": "b"}]}),
                false,
            )
            .unwrap();
        group.update(&mut conn, Some(&signals)).await.unwrap();

        assert_eq!(group.main().and_then(Record::id), Some(10));
        let items = group.sub_records("items").unwrap();
        assert_eq!(items[0].get_field("account_id").unwrap(), &SqlValue::Integer(10));
        assert_eq!(items[1].id(), Some(12));
        assert_eq!(conn.committed().len(), 3);
        assert_eq!(conn.statements().first().map(String::as_str), Some("BEGIN"));
        assert_eq!(conn.statements().last().map(String::as_str), Some("COMMIT"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["accounts-added", "items-added", "items-added"]
        );
    }

    #[tokio::test]
    async fn test_sub_record_failure_rolls_back_everything() {
        let mut conn = MockConnection::new();
        conn.fail_when("'boom'");
        let signals = SignalManager::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        signals.add_callback(move |_| *sink.lock().unwrap() += 1);

        let mut group = RecordGroup::new(schema());
        group
            .fill_input_data(
                &json!({
                    "main": {"id": 1, "name": "Alicia"},
                    "items": [{"id": 5, "account_id": 1, "label": "keep"}, {"label": "boom"}]
                }),
                true,
            )
            .unwrap();

        let err = group.update(&mut conn, Some(&signals)).await.unwrap_err();
        match err {
            StorehausError::SubRecordFailed { category, index, source } => {
                assert_eq!(category, "items");
                assert_eq!(index, 1);
                assert!(matches!(*source, StorehausError::QueryFailed { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(conn.committed().is_empty());
        assert_eq!(conn.statements().last().map(String::as_str), Some("ROLLBACK"));
        assert_eq!(*seen.lock().unwrap(), 0);
        // group restored: the new sub-record is still unlinked and unsaved
        let items = group.sub_records("items").unwrap();
        assert!(!items[1].exists());
        assert!(items[1].get_field("account_id").is_err());
    }

    #[tokio::test]
    async fn test_main_failure_rolls_back() {
        let mut conn = MockConnection::new();
        conn.fail_when("INSERT INTO `accounts`");
        let mut group = RecordGroup::new(schema());
        group.fill_main(&row(&[("name", "Alice".into())]), false).unwrap();

        let err = group.update(&mut conn, None).await.unwrap_err();
        assert!(matches!(err, StorehausError::QueryFailed { .. }));
        assert!(!conn.in_transaction());
        assert!(!group.main().unwrap().exists());
    }

    #[test]
    fn test_fill_input_data_rejects_unknown_category() {
        let mut group = RecordGroup::new(schema());
        let err = group
            .fill_input_data(&json!({"main": {"name": "A"}, "tags": []}), false)
            .unwrap_err();
        assert!(matches!(err, StorehausError::UnknownCategory { .. }));
        assert!(group.main().is_none());
    }

    #[test]
    fn test_fill_data_is_atomic() {
        let mut group = RecordGroup::new(schema());
        let rows = GroupRows {
            main: row(&[("id", 1.into()), ("name", "Alice".into())]),
            categories: HashMap::from([(
                "items".to_string(),
                vec![row(&[("id", 2.into()), ("label", "far too long label".into())])],
            )]),
        };
        assert!(group.fill_data(&rows, true).is_err());
        assert!(group.main().is_none());
    }

    #[test]
    fn test_sub_record_management() {
        let mut group = RecordGroup::new(schema());
        let mut item = group.new_sub_record("items").unwrap();
        item.set_field("label", "x").unwrap();
        group.add_sub_record("items", item).unwrap();
        group
            .append_data("items", &[row(&[("label", "y".into())])], false)
            .unwrap();
        assert_eq!(group.sub_records("items").unwrap().len(), 2);

        let stranger = Record::new(Arc::clone(group.schema().main()));
        assert!(group.add_sub_record("items", stranger).is_err());
        assert!(group.sub_records("nope").is_err());
    }

    #[test]
    fn test_to_json_lists_every_category() {
        let mut group = RecordGroup::new(schema());
        group.fill_main(&row(&[("id", 1.into()), ("name", "Alice".into())]), true).unwrap();
        assert_eq!(
            group.to_json(),
            json!({"main": {"id": 1, "name": "Alice"}, "items": []})
        );
    }

    #[tokio::test]
    async fn test_select_loads_each_aggregate() {
        let mut conn = MockConnection::new();
        conn.on_fetch("SELECT DISTINCT", vec![row(&[("id", 1.into())])])
            .on_fetch(
                "FROM `accounts` WHERE",
                vec![row(&[("id", 1.into()), ("name", "Alice".into())])],
            )
            .on_fetch(
                "FROM `items` WHERE",
                vec![
                    row(&[("id", 3.into()), ("account_id", 1.into()), ("label", "vip".into())]),
                    row(&[("id", 4.into()), ("account_id", 1.into()), ("label", "early".into())]),
                ],
            );

        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("items.label", "vip"))
            .limit(1);
        let groups = RecordGroup::find(&schema(), &mut conn, &query).await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].sub_records("items").unwrap().len(), 2);
        assert_eq!(
            conn.statements()[0],
            "SELECT DISTINCT `accounts`.`id` AS `id` FROM `accounts` \
             LEFT JOIN `items` ON `accounts`.`id` = `items`.`account_id` \
             WHERE `items`.`label` = 'vip' ORDER BY `accounts`.`id` LIMIT 1"
        );
        assert!(conn.statements()[2].ends_with("WHERE `items`.`account_id` = 1 ORDER BY `items`.`id`"));
    }
}
