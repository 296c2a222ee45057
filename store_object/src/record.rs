//! Single-table records

use crate::connection::{Connection, Row};
use crate::errors::StorehausError;
use crate::field::Field;
use crate::schema::{RecordSchema, PRIMARY_KEY};
use signal_system::{DatabaseEvent, EventType, SignalManager};
use std::sync::Arc;
use type_mapping::{json_object_to_row, quote_identifier, Dialect, SqlValue};

/// One row of one table.
///
/// A record that does not exist yet is written with INSERT, an existing one
/// with UPDATE keyed by its `id`.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    id: Field,
    fields: Vec<Field>,
    exists: bool,
}

/// Where a column of the input lands
#[derive(Clone, Copy)]
enum Slot {
    PrimaryKey,
    Field(usize),
}

impl Record {
    /// Empty record: every field uninitialized, not persisted
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let id = schema.primary_key().instantiate();
        let fields = schema.fields().iter().map(|spec| spec.instantiate()).collect();
        Self {
            schema,
            id,
            fields,
            exists: false,
        }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Primary key, once assigned
    pub fn id(&self) -> Option<i64> {
        self.id.value().ok().and_then(SqlValue::as_i64)
    }

    fn slot(&self, name: &str) -> Result<Slot, StorehausError> {
        if name == PRIMARY_KEY {
            return Ok(Slot::PrimaryKey);
        }
        self.schema
            .position(name)
            .map(Slot::Field)
            .ok_or_else(|| StorehausError::missing_field(self.table_name(), name))
    }

    fn slot_field(&self, slot: Slot) -> &Field {
        match slot {
            Slot::PrimaryKey => &self.id,
            Slot::Field(i) => &self.fields[i],
        }
    }

    fn slot_field_mut(&mut self, slot: Slot) -> &mut Field {
        match slot {
            Slot::PrimaryKey => &mut self.id,
            Slot::Field(i) => &mut self.fields[i],
        }
    }

    /// Assign several columns at once.
    ///
    /// Every value is checked before any is stored: an unknown column or a
    /// rejected value leaves the record untouched.
    pub fn fill_data(&mut self, data: &Row, exists: bool) -> Result<(), StorehausError> {
        let mut slots = Vec::with_capacity(data.len());
        for name in data.keys() {
            slots.push((self.slot(name)?, name));
        }
        // declaration order keeps error reporting stable
        slots.sort_by_key(|(slot, _)| match slot {
            Slot::PrimaryKey => 0,
            Slot::Field(i) => i + 1,
        });

        let mut checked = Vec::with_capacity(slots.len());
        for (slot, name) in slots {
            let value = self.slot_field(slot).check(data[name].clone())?;
            checked.push((slot, value));
        }

        for (slot, value) in checked {
            self.slot_field_mut(slot).assign(value);
        }
        self.exists = exists;
        Ok(())
    }

    /// Assign columns from a JSON object received from a client
    pub fn fill_input_data(
        &mut self,
        input: &serde_json::Value,
        exists: bool,
    ) -> Result<(), StorehausError> {
        let row = input_row(input, self.table_name())?;
        self.fill_data(&row, exists)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.slot(name).ok().map(|slot| self.slot_field(slot))
    }

    /// Value of a column; fails when it is unknown or was never assigned
    pub fn get_field(&self, name: &str) -> Result<&SqlValue, StorehausError> {
        let slot = self.slot(name)?;
        Ok(self.slot_field(slot).value()?)
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<SqlValue>) -> Result<(), StorehausError> {
        let slot = self.slot(name)?;
        Ok(self.slot_field_mut(slot).set_value(value)?)
    }

    fn id_literal(&self, dialect: Dialect) -> Result<String, StorehausError> {
        Ok(self.id.sql_literal(dialect)?)
    }

    /// `INSERT` of every assigned column, `id` included when set
    pub fn insert_sql(&self, dialect: Dialect) -> Result<String, StorehausError> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for field in std::iter::once(&self.id).chain(self.fields.iter()) {
            if field.is_initialized() {
                columns.push(quote_identifier(field.name()));
                values.push(field.sql_literal(dialect)?);
            }
        }
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(self.table_name()),
            columns.join(", "),
            values.join(", ")
        ))
    }

    /// `UPDATE` of every assigned column, keyed by `id`
    pub fn update_sql(&self, dialect: Dialect) -> Result<String, StorehausError> {
        let id = self.id_literal(dialect)?;
        let mut assignments = Vec::new();
        for field in self.fields.iter().filter(|f| f.is_initialized()) {
            assignments.push(format!(
                "{} = {}",
                quote_identifier(field.name()),
                field.sql_literal(dialect)?
            ));
        }
        if assignments.is_empty() {
            return Err(StorehausError::EmptyUpdate {
                table: self.table_name().to_string(),
            });
        }
        Ok(format!(
            "UPDATE {} SET {} WHERE {} = {}",
            quote_identifier(self.table_name()),
            assignments.join(", "),
            quote_identifier(PRIMARY_KEY),
            id
        ))
    }

    pub fn delete_sql(&self, dialect: Dialect) -> Result<String, StorehausError> {
        Ok(format!(
            "DELETE FROM {} WHERE {} = {}",
            quote_identifier(self.table_name()),
            quote_identifier(PRIMARY_KEY),
            self.id_literal(dialect)?
        ))
    }

    fn event(&self, event_type: EventType) -> DatabaseEvent {
        let mut event = DatabaseEvent::new(event_type, self.table_name());
        if let Some(id) = self.id() {
            event = event.with_record_id(id);
        }
        for field in self.fields.iter().filter(|f| f.is_initialized()) {
            if let Ok(value) = field.value() {
                event.add_payload(field.name(), value.clone());
            }
        }
        event
    }

    /// Write the record and return the event describing the write, without
    /// emitting it
    pub async fn persist(&mut self, conn: &mut dyn Connection) -> Result<DatabaseEvent, StorehausError> {
        if self.exists {
            let sql = self.update_sql(conn.dialect())?;
            conn.execute(&sql).await?;
            return Ok(self.event(EventType::Changed));
        }

        let sql = self.insert_sql(conn.dialect())?;
        conn.execute(&sql).await?;
        if !self.id.is_initialized() {
            let id = conn
                .last_insert_id()
                .ok_or_else(|| StorehausError::MissingInsertId {
                    table: self.table_name().to_string(),
                })?;
            self.id.assign(SqlValue::Integer(id));
        }
        self.exists = true;
        Ok(self.event(EventType::Added))
    }

    /// INSERT or UPDATE the record, then notify `signals`
    pub async fn update(
        &mut self,
        conn: &mut dyn Connection,
        signals: Option<&SignalManager>,
    ) -> Result<(), StorehausError> {
        let event = self.persist(conn).await?;
        if let Some(signals) = signals {
            signals.emit(event);
        }
        Ok(())
    }

    /// Delete the stored row.
    ///
    /// Returns whether a row was removed. Fails without touching the
    /// database when the record is not persisted.
    pub async fn delete(
        &mut self,
        conn: &mut dyn Connection,
        signals: Option<&SignalManager>,
    ) -> Result<bool, StorehausError> {
        if !self.exists {
            return Err(StorehausError::NotPersisted {
                table: self.table_name().to_string(),
            });
        }
        let sql = self.delete_sql(conn.dialect())?;
        let affected = conn.execute(&sql).await?;
        self.exists = false;
        if let Some(signals) = signals {
            signals.emit(self.event(EventType::Deleted));
        }
        Ok(affected > 0)
    }

    /// `id` and every assigned column
    pub fn to_json(&self) -> serde_json::Value {
        let map = std::iter::once(&self.id)
            .chain(self.fields.iter())
            .filter_map(|f| f.value().ok().map(|v| (f.name().to_string(), v.to_json())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Convert a client JSON object into a row
pub(crate) fn input_row(input: &serde_json::Value, context: &str) -> Result<Row, StorehausError> {
    let object = input.as_object().ok_or_else(|| {
        StorehausError::InvalidInput(format!("input for '{}' must be a JSON object", context))
    })?;
    json_object_to_row(object).map_err(|key| {
        StorehausError::InvalidInput(format!(
            "value of '{}' for '{}' must be a scalar",
            key, context
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FieldError;
    use crate::field::FieldSpec;
    use crate::testing::MockConnection;
    use serde_json::json;
    use std::sync::Mutex;

    fn accounts() -> Arc<RecordSchema> {
        RecordSchema::builder("accounts")
            .field(FieldSpec::string("name").length(1, 45))
            .field(FieldSpec::numeric("age").range(0, 150).nullable(true))
            .build()
            .unwrap()
    }

    fn row(pairs: &[(&str, SqlValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fill_data_unknown_field() {
        let mut record = Record::new(accounts());
        let err = record
            .fill_data(&row(&[("nickname", "x".into())]), false)
            .unwrap_err();
        assert!(matches!(err, StorehausError::MissingField { ref field, .. } if field == "nickname"));
    }

    #[test]
    fn test_fill_data_is_atomic() {
        let mut record = Record::new(accounts());
        let err = record
            .fill_data(&row(&[("name", "Alice".into()), ("age", 200.into())]), true)
            .unwrap_err();
        assert!(matches!(
            err,
            StorehausError::Field(FieldError::OutOfRange { .. })
        ));
        assert!(record.get_field("name").is_err());
        assert!(!record.exists());
    }

    #[test]
    fn test_get_field_routes_id() {
        let mut record = Record::new(accounts());
        record
            .fill_data(&row(&[("id", 3.into()), ("name", "Bob".into())]), true)
            .unwrap();
        assert_eq!(record.get_field("id").unwrap(), &SqlValue::Integer(3));
        assert_eq!(record.id(), Some(3));
        assert!(matches!(
            record.get_field("age"),
            Err(StorehausError::Field(FieldError::NotInitialized { .. }))
        ));
    }

    #[test]
    fn test_sql_generation() {
        let mut record = Record::new(accounts());
        record
            .fill_data(&row(&[("name", "O'Brien".into()), ("age", 40.into())]), false)
            .unwrap();
        assert_eq!(
            record.insert_sql(Dialect::MySql).unwrap(),
            r"INSERT INTO `accounts` (`name`, `age`) VALUES ('O\'Brien', 40)"
        );

        record.set_field("id", 9).unwrap();
        assert_eq!(
            record.update_sql(Dialect::MySql).unwrap(),
            r"UPDATE `accounts` SET `name` = 'O\'Brien', `age` = 40 WHERE `id` = 9"
        );
        assert_eq!(
            record.delete_sql(Dialect::MySql).unwrap(),
            "DELETE FROM `accounts` WHERE `id` = 9"
        );
    }

    #[tokio::test]
    async fn test_update_inserts_fresh_record() {
        let mut conn = MockConnection::new();
        conn.set_next_insert_id(42);
        let signals = SignalManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        signals.add_callback(move |e| sink.lock().unwrap().push(e.name()));

        let mut record = Record::new(accounts());
        record.set_field("name", "Alice").unwrap();
        record.update(&mut conn, Some(&signals)).await.unwrap();

        assert!(record.exists());
        assert_eq!(record.id(), Some(42));
        assert!(conn.statements()[0].starts_with("INSERT INTO `accounts`"));
        assert_eq!(*seen.lock().unwrap(), vec!["accounts-added".to_string()]);
    }

    #[tokio::test]
    async fn test_sqlite_connection_gets_doubled_quotes() {
        let mut conn = MockConnection::new().with_dialect(Dialect::Sqlite);
        let mut record = Record::new(accounts());
        record
            .fill_data(&row(&[("id", 7.into()), ("name", "Ann".into())]), true)
            .unwrap();
        record
            .set_field("name", "x'); DROP TABLE accounts; --")
            .unwrap();
        record.update(&mut conn, None).await.unwrap();

        assert_eq!(
            conn.statements(),
            ["UPDATE `accounts` SET `name` = 'x''); DROP TABLE accounts; --' WHERE `id` = 7"]
        );
    }

    #[tokio::test]
    async fn test_update_existing_record_uses_update() {
        let mut conn = MockConnection::new();
        let mut record = Record::new(accounts());
        record
            .fill_data(&row(&[("id", 7.into()), ("name", "Alice".into())]), true)
            .unwrap();
        record.set_field("name", "Alicia").unwrap();
        record.update(&mut conn, None).await.unwrap();

        assert_eq!(
            conn.statements(),
            ["UPDATE `accounts` SET `name` = 'Alicia' WHERE `id` = 7"]
        );
    }

    #[tokio::test]
    async fn test_empty_update_issues_no_sql() {
        let mut conn = MockConnection::new();
        let mut record = Record::new(accounts());
        record.fill_data(&row(&[("id", 7.into())]), true).unwrap();

        let err = record.update(&mut conn, None).await.unwrap_err();
        assert!(matches!(err, StorehausError::EmptyUpdate { .. }));
        assert!(conn.statements().is_empty());
    }

    #[tokio::test]
    async fn test_missing_insert_id() {
        let mut conn = MockConnection::new();
        conn.without_insert_ids();
        let mut record = Record::new(accounts());
        record.set_field("name", "Alice").unwrap();

        let err = record.update(&mut conn, None).await.unwrap_err();
        assert!(matches!(err, StorehausError::MissingInsertId { .. }));
        assert!(!record.exists());
    }

    #[tokio::test]
    async fn test_supplied_id_is_kept() {
        let mut conn = MockConnection::new();
        conn.set_next_insert_id(100);
        let mut record = Record::new(accounts());
        record
            .fill_data(&row(&[("id", 5.into()), ("name", "Eve".into())]), false)
            .unwrap();
        record.update(&mut conn, None).await.unwrap();

        assert_eq!(record.id(), Some(5));
        assert!(conn.statements()[0].contains("(`id`, `name`) VALUES (5, 'Eve')"));
    }

    #[tokio::test]
    async fn test_delete_requires_existing_record() {
        let mut conn = MockConnection::new();
        let mut record = Record::new(accounts());
        let err = record.delete(&mut conn, None).await.unwrap_err();
        assert!(matches!(err, StorehausError::NotPersisted { .. }));
        assert!(conn.statements().is_empty());
    }

    #[tokio::test]
    async fn test_delete_emits_event() {
        let mut conn = MockConnection::new();
        let signals = SignalManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        signals.add_callback(move |e| sink.lock().unwrap().push(e.name()));

        let mut record = Record::new(accounts());
        record.fill_data(&row(&[("id", 2.into())]), true).unwrap();
        assert!(record.delete(&mut conn, Some(&signals)).await.unwrap());
        assert!(!record.exists());
        assert_eq!(*seen.lock().unwrap(), vec!["accounts-deleted".to_string()]);
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let mut conn = MockConnection::new();
        conn.fail_when("INSERT");
        let mut record = Record::new(accounts());
        record.set_field("name", "Alice").unwrap();

        let err = record.update(&mut conn, None).await.unwrap_err();
        assert!(matches!(err, StorehausError::QueryFailed { .. }));
        assert!(!record.exists());
    }

    #[test]
    fn test_fill_input_data_and_to_json() {
        let mut record = Record::new(accounts());
        record
            .fill_input_data(&json!({"id": 1, "name": "Alice", "age": null}), true)
            .unwrap();
        assert_eq!(
            record.to_json(),
            json!({"id": 1, "name": "Alice", "age": null})
        );

        let nested = record.fill_input_data(&json!({"name": ["a"]}), true);
        assert!(matches!(nested, Err(StorehausError::InvalidInput(_))));
        let not_object = record.fill_input_data(&json!([1, 2]), true);
        assert!(matches!(not_object, Err(StorehausError::InvalidInput(_))));
    }
}
