//! Core RecordHaus functionality
//!
//! This module contains the main RecordHaus struct: it owns the database
//! connection and the signal manager, maps group names to schemas and
//! routes requests to the matching record operations.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use config::DatabaseConfig;
use signal_system::SignalManager;
use store_object::{
    Connection, GroupSchema, QueryBuilder, QueryFilter, Record, RecordGroup, RecordSchema,
    Selector, SqlxConnection, StorehausError, PRIMARY_KEY,
};
use type_mapping::SqlValue;

use crate::errors::RecordHausError;
use crate::request::{Action, Request, Response};

/// What a group name resolves to
#[derive(Debug, Clone)]
enum Entity {
    Record(Arc<RecordSchema>),
    Group(Arc<GroupSchema>),
}

/// Main RecordHaus coordinator that manages the database connection and the
/// registered groups
pub struct RecordHaus {
    conn: Box<dyn Connection>,
    signals: Arc<SignalManager>,
    entities: HashMap<String, Entity>,
}

impl RecordHaus {
    /// Create a coordinator over an existing connection
    pub fn new(conn: Box<dyn Connection>, signals: Arc<SignalManager>) -> Self {
        Self {
            conn,
            signals,
            entities: HashMap::new(),
        }
    }

    /// Connect to the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RecordHausError> {
        let conn = SqlxConnection::connect(config).await?;
        Ok(Self::new(Box::new(conn), Arc::new(SignalManager::new())))
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    /// Direct access to the connection, e.g. for schema setup
    pub fn connection(&mut self) -> &mut dyn Connection {
        self.conn.as_mut()
    }

    fn register(&mut self, group: &str, entity: Entity) -> Result<(), RecordHausError> {
        if self.entities.contains_key(group) {
            return Err(RecordHausError::GroupAlreadyRegistered(group.to_string()));
        }
        self.entities.insert(group.to_string(), entity);
        Ok(())
    }

    /// Route `group` to single-table records
    pub fn register_record(
        &mut self,
        group: &str,
        schema: Arc<RecordSchema>,
    ) -> Result<(), RecordHausError> {
        self.register(group, Entity::Record(schema))
    }

    /// Route `group` to record groups
    pub fn register_group(
        &mut self,
        group: &str,
        schema: Arc<GroupSchema>,
    ) -> Result<(), RecordHausError> {
        self.register(group, Entity::Group(schema))
    }

    pub fn unregister(&mut self, group: &str) -> Result<(), RecordHausError> {
        self.entities
            .remove(group)
            .map(|_| ())
            .ok_or_else(|| RecordHausError::UnknownGroup(group.to_string()))
    }

    /// List all registered group names, sorted
    pub fn list_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        groups.sort_unstable();
        groups
    }

    /// Handle a request and wrap the outcome in the response envelope
    pub async fn handle(&mut self, request: &Request) -> Response {
        match self.execute(request).await {
            Ok(data) => Response::success(data),
            Err(e) => {
                tracing::warn!(
                    group = %request.group,
                    action = %request.action,
                    errno = e.code(),
                    error = %e,
                    "request failed"
                );
                Response::failure(&e)
            }
        }
    }

    /// Handle a request in wire format
    pub async fn handle_json(&mut self, body: &str) -> Response {
        crate::trace_log!(body, "raw request");
        match Request::from_json(body) {
            Ok(request) => self.handle(&request).await,
            Err(e) => Response::failure(&e),
        }
    }

    /// Run a request and return its result data
    pub async fn execute(&mut self, request: &Request) -> Result<Value, RecordHausError> {
        let entity = self
            .entities
            .get(&request.group)
            .cloned()
            .ok_or_else(|| RecordHausError::UnknownGroup(request.group.clone()))?;
        crate::debug_log!(group = %request.group, action = %request.action, "handling request");

        let exists = request.action != Action::Add;
        let conn = self.conn.as_mut();
        let signals = Some(self.signals.as_ref());

        let data = match (entity, request.action) {
            (Entity::Record(schema), Action::Select) => {
                let query = equality_query(&request.params, |column| {
                    record_column(&schema, column)
                })?;
                let records = Selector::new(schema).find(conn, &query).await?;
                Value::Array(records.iter().map(Record::to_json).collect())
            }
            (Entity::Record(schema), Action::Delete) => {
                let mut record = Record::new(schema);
                record.fill_input_data(&request.data, exists)?;
                let deleted = record.delete(conn, signals).await?;
                serde_json::json!({ "deleted": deleted })
            }
            (Entity::Record(schema), _) => {
                let mut record = Record::new(schema);
                record.fill_input_data(&request.data, exists)?;
                record.update(conn, signals).await?;
                record.to_json()
            }
            (Entity::Group(schema), Action::Select) => {
                let query = equality_query(&request.params, |column| {
                    group_column(&schema, column)
                })?;
                let groups = RecordGroup::find(&schema, conn, &query).await?;
                Value::Array(groups.iter().map(RecordGroup::to_json).collect())
            }
            (Entity::Group(schema), Action::Delete) => {
                let mut group = RecordGroup::new(schema);
                group.fill_input_data(&request.data, exists)?;
                let deleted = group.delete(conn, signals).await?;
                serde_json::json!({ "deleted": deleted })
            }
            (Entity::Group(schema), _) => {
                let mut group = RecordGroup::new(schema);
                group.fill_input_data(&request.data, exists)?;
                group.update(conn, signals).await?;
                group.to_json()
            }
        };
        Ok(data)
    }

    /// Check database connection health
    pub async fn health_check(&mut self) -> Result<(), RecordHausError> {
        self.conn.fetch("SELECT 1").await?;
        Ok(())
    }
}

/// Qualified column of a single-table select parameter
fn record_column(schema: &RecordSchema, column: &str) -> Result<String, RecordHausError> {
    if !schema.has_column(column) {
        return Err(StorehausError::missing_field(schema.table_name(), column).into());
    }
    Ok(format!("{}.{}", schema.table_name(), column))
}

/// Qualified column of a group select parameter: `table.column`, or a bare
/// column of the main table
fn group_column(schema: &GroupSchema, column: &str) -> Result<String, RecordHausError> {
    let (table, name) = column
        .split_once('.')
        .unwrap_or((schema.main().table_name(), column));
    let table_schema = if table == schema.main().table_name() {
        Some(schema.main())
    } else {
        schema
            .categories()
            .iter()
            .find(|c| c.table_name() == table)
            .map(|c| &c.schema)
    };
    match table_schema {
        Some(s) if s.has_column(name) => Ok(format!("{}.{}", table, name)),
        _ => Err(StorehausError::missing_field(table, name).into()),
    }
}

/// Equality filters from a `{column: value}` object; null or absent params
/// select everything
fn equality_query<F>(params: &Value, resolve: F) -> Result<QueryBuilder, RecordHausError>
where
    F: Fn(&str) -> Result<String, RecordHausError>,
{
    let mut query = QueryBuilder::new();
    let object = match params {
        Value::Null => return Ok(query),
        Value::Object(object) => object,
        _ => {
            return Err(RecordHausError::RequestFormat(
                "'params' must be a JSON object".to_string(),
            ))
        }
    };

    let mut columns: Vec<&String> = object.keys().collect();
    columns.sort();
    for column in columns {
        let value = SqlValue::from_json(&object[column]).ok_or_else(|| {
            RecordHausError::RequestFormat(format!("param '{}' must be a scalar", column))
        })?;
        query = query.filter(QueryFilter::eq(&resolve(column)?, value));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use store_object::testing::MockConnection;
    use store_object::FieldSpec;

    fn accounts() -> Arc<RecordSchema> {
        RecordSchema::builder("accounts")
            .field(FieldSpec::string("name"))
            .build()
            .unwrap()
    }

    fn haus() -> RecordHaus {
        let mut haus = RecordHaus::new(
            Box::new(MockConnection::new()),
            Arc::new(SignalManager::new()),
        );
        haus.register_record("accounts", accounts()).unwrap();
        haus
    }

    #[test]
    fn test_registry() {
        let mut haus = haus();
        assert!(matches!(
            haus.register_record("accounts", accounts()),
            Err(RecordHausError::GroupAlreadyRegistered(_))
        ));
        assert_eq!(haus.list_groups(), vec!["accounts"]);
        haus.unregister("accounts").unwrap();
        assert!(haus.list_groups().is_empty());
        assert!(matches!(
            haus.unregister("accounts"),
            Err(RecordHausError::UnknownGroup(_))
        ));
    }

    #[tokio::test]
    async fn test_add_returns_record() {
        let mut haus = haus();
        let request = Request::new("accounts", Action::Add).with_data(json!({"name": "Alice"}));
        let response = haus.handle(&request).await;

        assert!(response.success);
        assert_eq!(response.errno, 0);
        assert_eq!(response.data, json!({"id": 1, "name": "Alice"}));
    }

    #[tokio::test]
    async fn test_unknown_group() {
        let mut haus = haus();
        let response = haus.handle(&Request::new("ghosts", Action::Select)).await;
        assert!(!response.success);
        assert_eq!(response.errno, 60);
    }

    #[tokio::test]
    async fn test_validation_error_is_reported() {
        let mut haus = haus();
        let request = Request::new("accounts", Action::Update).with_data(json!({"id": 1, "nick": "x"}));
        let response = haus.handle(&request).await;
        assert!(!response.success);
        assert_eq!(response.errno, 3);
        assert!(response.error.contains("nick"));
    }

    #[tokio::test]
    async fn test_select_params_become_filters() {
        let mut haus = haus();
        let request = Request::new("accounts", Action::Select).with_params(json!({"name": "Alice"}));
        let response = haus.handle(&request).await;
        assert!(response.success);
        assert_eq!(response.data, json!([]));

        let bad = Request::new("accounts", Action::Select).with_params(json!({"age": 3}));
        assert_eq!(haus.handle(&bad).await.errno, 3);
    }

    #[tokio::test]
    async fn test_handle_json_rejects_malformed_body() {
        let mut haus = haus();
        let response = haus.handle_json("{\"info\": {}}").await;
        assert!(!response.success);
        assert_eq!(response.errno, 61);
    }

    #[test]
    fn test_group_column_resolution() {
        let tags = RecordSchema::builder("accounts_tags")
            .field(FieldSpec::numeric("account_id"))
            .field(FieldSpec::string("tag"))
            .build()
            .unwrap();
        let group = GroupSchema::builder(accounts())
            .category("accounts_tags", tags, "account_id")
            .build()
            .unwrap();

        assert_eq!(group_column(&group, "name").unwrap(), "accounts.name");
        assert_eq!(
            group_column(&group, "accounts_tags.tag").unwrap(),
            "accounts_tags.tag"
        );
        assert!(group_column(&group, "accounts_tags.color").is_err());
        assert!(group_column(&group, "other.id").is_err());
        assert_eq!(record_column(&accounts(), PRIMARY_KEY).unwrap(), "accounts.id");
    }
}
