//! Single-join read path for record groups
//!
//! All tables are read with one wide LEFT JOIN. Columns are aliased as
//! `<table><separator><column>`; rows are ordered by main id so that a change
//! of main id marks the start of the next aggregate.

use crate::connection::{Connection, Row};
use crate::errors::StorehausError;
use crate::query_builder::QueryBuilder;
use crate::record::Record;
use crate::record_group::RecordGroup;
use crate::schema::{GroupSchema, RecordSchema, PRIMARY_KEY};
use config::FieldDefaults;
use std::collections::HashSet;
use std::sync::Arc;
use type_mapping::SqlValue;

/// Separator used when none is configured
pub const DEFAULT_SEPARATOR: &str = "_%|%_";

#[derive(Debug, Clone)]
pub struct RecordGroupSelector {
    schema: Arc<GroupSchema>,
    separator: String,
}

impl RecordGroupSelector {
    pub fn new(schema: Arc<GroupSchema>) -> Self {
        Self::with_separator(schema, DEFAULT_SEPARATOR)
    }

    pub fn with_separator(schema: Arc<GroupSchema>, separator: &str) -> Self {
        Self {
            schema,
            separator: separator.to_string(),
        }
    }

    /// Selector using the configured table/column separator
    pub fn from_defaults(schema: Arc<GroupSchema>, defaults: &FieldDefaults) -> Self {
        Self::with_separator(schema, &defaults.table_field_separator)
    }

    pub fn schema(&self) -> &Arc<GroupSchema> {
        &self.schema
    }

    fn alias(&self, table: &str, column: &str) -> String {
        format!("{}{}{}", table, self.separator, column)
    }

    fn tables(&self) -> impl Iterator<Item = &Arc<RecordSchema>> {
        std::iter::once(self.schema.main()).chain(self.schema.categories().iter().map(|c| &c.schema))
    }

    /// Joined select over every table of the group
    pub fn select_sql(&self, where_clause: &str) -> String {
        let columns = self
            .tables()
            .flat_map(|table| {
                table
                    .columns()
                    .map(move |spec| {
                        table.column_expression(spec, &self.alias(table.table_name(), spec.name()))
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .join(", ");

        let order = self
            .tables()
            .map(|table| table.qualified(PRIMARY_KEY))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM {}", columns, self.schema.join_clause());
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
        sql
    }

    pub async fn select(
        &self,
        conn: &mut dyn Connection,
        where_clause: &str,
    ) -> Result<Vec<RecordGroup>, StorehausError> {
        let rows = conn.fetch(&self.select_sql(where_clause)).await?;
        self.assemble(&rows)
    }

    /// Joined select with a composed condition.
    ///
    /// Ordering is fixed by main id. Limit and offset count aggregates, not
    /// joined rows, and are applied after assembly.
    pub async fn find(
        &self,
        conn: &mut dyn Connection,
        query: &QueryBuilder,
    ) -> Result<Vec<RecordGroup>, StorehausError> {
        let condition = query.build_where_condition_for(conn.dialect());
        let groups = self.select(conn, &condition).await?;
        let offset = query.offset_value().unwrap_or(0).max(0) as usize;
        let limit = query
            .limit_value()
            .map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(groups.into_iter().skip(offset).take(limit).collect())
    }

    /// Columns of `table` from a joined row, un-aliased
    fn extract(&self, table: &RecordSchema, row: &Row) -> Row {
        table
            .columns()
            .filter_map(|spec| {
                row.get(&self.alias(table.table_name(), spec.name()))
                    .map(|v| (spec.name().to_string(), v.clone()))
            })
            .collect()
    }

    /// Split joined rows into aggregates.
    ///
    /// A new main id starts a new aggregate. Sub-rows repeated by the fan-out
    /// of several categories are kept once, NULL sub ids (no match in the
    /// LEFT JOIN) are skipped. Rows must arrive ordered by main id.
    pub fn assemble(&self, rows: &[Row]) -> Result<Vec<RecordGroup>, StorehausError> {
        let main_schema = self.schema.main();
        let main_id_key = self.alias(main_schema.table_name(), PRIMARY_KEY);
        let category_count = self.schema.categories().len();

        let mut groups: Vec<RecordGroup> = Vec::new();
        let mut current: Option<i64> = None;
        let mut closed = HashSet::new();
        let mut seen_subs: Vec<HashSet<i64>> = vec![HashSet::new(); category_count];

        for row in rows {
            let main_id = row
                .get(&main_id_key)
                .and_then(SqlValue::as_i64)
                .ok_or_else(|| {
                    StorehausError::InvalidInput(format!("joined row without '{}'", main_id_key))
                })?;

            if current != Some(main_id) {
                if let Some(previous) = current {
                    closed.insert(previous);
                }
                if closed.contains(&main_id) {
                    return Err(StorehausError::InvalidInput(format!(
                        "joined rows are not ordered by main id: {} reappeared",
                        main_id
                    )));
                }
                let mut group = RecordGroup::new(Arc::clone(&self.schema));
                group.fill_main(&self.extract(main_schema, row), true)?;
                groups.push(group);
                current = Some(main_id);
                seen_subs.iter_mut().for_each(HashSet::clear);
            }

            let group = match groups.last_mut() {
                Some(group) => group,
                None => continue,
            };
            for (index, category) in self.schema.categories().iter().enumerate() {
                let id_key = self.alias(category.table_name(), PRIMARY_KEY);
                let sub_id = match row.get(&id_key).and_then(SqlValue::as_i64) {
                    Some(id) => id,
                    None => continue,
                };
                if !seen_subs[index].insert(sub_id) {
                    continue;
                }
                let mut record = Record::new(Arc::clone(&category.schema));
                record.fill_data(&self.extract(&category.schema, row), true)?;
                group.add_sub_record(&category.name, record)?;
            }
        }

        Ok(groups)
    }
}
