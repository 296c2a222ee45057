//! Schema registry
//!
//! Table layouts are plain data: a [`RecordSchema`] lists the field specs of
//! one table, a [`GroupSchema`] ties a main table to its dependent
//! categories. Both are built once and shared through `Arc`.

use crate::errors::StorehausError;
use crate::field::{FieldKind, FieldSpec};
use crate::query_builder::join::JoinClause;
use crate::validation::Identifier;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use type_mapping::quote_identifier;

/// Name of the primary key column every table carries
pub const PRIMARY_KEY: &str = "id";

/// Category name reserved for the main record in group input
pub const MAIN_KEY: &str = "main";

#[derive(Debug)]
pub struct RecordSchema {
    table: Identifier,
    primary_key: Arc<FieldSpec>,
    fields: Vec<Arc<FieldSpec>>,
    index: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn builder(table: &str) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            table: table.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.as_str()
    }

    pub fn primary_key(&self) -> &Arc<FieldSpec> {
        &self.primary_key
    }

    /// Declared fields in declaration order, primary key excluded
    pub fn fields(&self) -> &[Arc<FieldSpec>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.position(name).map(|i| &self.fields[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == PRIMARY_KEY || self.index.contains_key(name)
    }

    /// Primary key followed by every declared field
    pub fn columns(&self) -> impl Iterator<Item = &Arc<FieldSpec>> {
        std::iter::once(&self.primary_key).chain(self.fields.iter())
    }

    /// `table`.`column`
    pub fn qualified(&self, column: &str) -> String {
        quote_identifier(&format!("{}.{}", self.table_name(), column))
    }

    /// Select expression of one column under the given alias.
    ///
    /// Datetime columns are read back as text, the generic driver layer
    /// cannot decode native DATETIME values.
    pub fn column_expression(&self, spec: &FieldSpec, alias: &str) -> String {
        let column = self.qualified(spec.name());
        let alias = format!("`{}`", alias.replace('`', "``"));
        match spec.kind() {
            FieldKind::DateTime { .. } => format!("CAST({} AS CHAR) AS {}", column, alias),
            _ => format!("{} AS {}", column, alias),
        }
    }

    /// Column list of `SELECT` statements for this table
    pub fn select_columns(&self) -> String {
        self.columns()
            .map(|spec| self.column_expression(spec, spec.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub struct RecordSchemaBuilder {
    table: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn build(self) -> Result<Arc<RecordSchema>, StorehausError> {
        let table = Identifier::new(&self.table)?;
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());

        for spec in self.fields {
            Identifier::new(spec.name())?;
            if let Some(problem) = spec.misconfiguration() {
                return Err(StorehausError::InvalidSchema(problem.to_string()));
            }
            if spec.name() == PRIMARY_KEY {
                return Err(StorehausError::InvalidSchema(format!(
                    "'{}' is reserved for the primary key of '{}'",
                    PRIMARY_KEY, self.table
                )));
            }
            if index.insert(spec.name().to_string(), fields.len()).is_some() {
                return Err(StorehausError::InvalidSchema(format!(
                    "duplicate field '{}' in '{}'",
                    spec.name(),
                    self.table
                )));
            }
            fields.push(Arc::new(spec));
        }

        Ok(Arc::new(RecordSchema {
            table,
            primary_key: Arc::new(FieldSpec::numeric(PRIMARY_KEY).mutable(false)),
            fields,
            index,
        }))
    }
}

/// Dependent sub-table of a group
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub schema: Arc<RecordSchema>,
    /// Column of the sub-table holding the main record's id
    pub foreign_key: String,
}

impl Category {
    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }
}

#[derive(Debug)]
pub struct GroupSchema {
    main: Arc<RecordSchema>,
    categories: Vec<Category>,
}

impl GroupSchema {
    pub fn builder(main: Arc<RecordSchema>) -> GroupSchemaBuilder {
        GroupSchemaBuilder {
            main,
            categories: Vec::new(),
        }
    }

    pub fn main(&self) -> &Arc<RecordSchema> {
        &self.main
    }

    /// Categories in declaration order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Main table LEFT JOINed with every category, in declaration order
    pub fn joins(&self) -> Vec<JoinClause> {
        self.categories
            .iter()
            .map(|category| {
                JoinClause::left(
                    category.table_name(),
                    format!("{}.{}", self.main.table_name(), PRIMARY_KEY),
                    format!("{}.{}", category.table_name(), category.foreign_key),
                )
            })
            .collect()
    }

    /// `FROM` target of group selects
    pub fn join_clause(&self) -> String {
        let mut sql = quote_identifier(self.main.table_name());
        for join in self.joins() {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }
        sql
    }
}

pub struct GroupSchemaBuilder {
    main: Arc<RecordSchema>,
    categories: Vec<Category>,
}

impl GroupSchemaBuilder {
    /// Add a category stored in `schema`, linked through `foreign_key`
    pub fn category(mut self, name: &str, schema: Arc<RecordSchema>, foreign_key: &str) -> Self {
        self.categories.push(Category {
            name: name.to_string(),
            schema,
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn build(self) -> Result<Arc<GroupSchema>, StorehausError> {
        let mut names = HashSet::new();
        let mut tables = HashSet::new();
        tables.insert(self.main.table_name().to_string());

        for category in &self.categories {
            if category.name.is_empty() || category.name == MAIN_KEY {
                return Err(StorehausError::InvalidSchema(format!(
                    "invalid category name '{}'",
                    category.name
                )));
            }
            if !names.insert(category.name.clone()) {
                return Err(StorehausError::InvalidSchema(format!(
                    "duplicate category '{}'",
                    category.name
                )));
            }
            if !tables.insert(category.table_name().to_string()) {
                return Err(StorehausError::InvalidSchema(format!(
                    "table '{}' appears twice in group '{}'",
                    category.table_name(),
                    self.main.table_name()
                )));
            }
            match category.schema.field(&category.foreign_key) {
                Some(spec) if matches!(spec.kind(), FieldKind::Numeric { .. }) => {}
                Some(_) => {
                    return Err(StorehausError::InvalidSchema(format!(
                        "foreign key '{}' of '{}' is not numeric",
                        category.foreign_key,
                        category.table_name()
                    )))
                }
                None => {
                    return Err(StorehausError::missing_field(
                        category.table_name(),
                        &category.foreign_key,
                    ))
                }
            }
        }

        Ok(Arc::new(GroupSchema {
            main: self.main,
            categories: self.categories,
        }))
    }
}
