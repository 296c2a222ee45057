use crate::query_builder::filter::QueryFilter;
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::sql_generation::SqlGenerator;
use type_mapping::Dialect;

/// Query builder for constructing WHERE/ORDER BY/LIMIT clauses
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    /// Add ordering
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    /// Conditions joined with AND, without the `WHERE` keyword, rendered
    /// with MySQL literals
    pub fn build_where_condition(&self) -> String {
        self.build_where_condition_for(Dialect::MySql)
    }

    /// Conditions joined with AND, literals rendered for `dialect`
    pub fn build_where_condition_for(&self, dialect: Dialect) -> String {
        SqlGenerator::build_condition(&self.conditions, dialect)
    }

    /// `WHERE ...` or an empty string
    pub fn build_where_clause(&self) -> String {
        self.build_where_clause_for(Dialect::MySql)
    }

    pub fn build_where_clause_for(&self, dialect: Dialect) -> String {
        SqlGenerator::build_where_clause(&self.conditions, dialect)
    }

    /// `ORDER BY ...` or an empty string
    pub fn build_order_clause(&self) -> String {
        SqlGenerator::build_order_clause(&self.order_by)
    }

    /// `LIMIT n OFFSET m` or an empty string
    pub fn build_limit_clause(&self) -> String {
        SqlGenerator::build_limit_clause(self.limit, self.offset)
    }

    /// Build complete query parts (WHERE, ORDER BY, LIMIT)
    pub fn build(&self) -> (String, String, String) {
        (
            self.build_where_clause(),
            self.build_order_clause(),
            self.build_limit_clause(),
        )
    }
}
