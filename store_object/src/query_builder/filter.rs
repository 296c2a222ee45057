//! Filter conditions

use type_mapping::SqlValue;

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    Like,      // LIKE
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

/// Single condition in WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    /// Column, optionally qualified as `table.column`
    pub field: String,
    pub operator: QueryOperator,
    pub values: Vec<SqlValue>,
}

/// Logical operators for combining conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Query filter that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
}

impl QueryFilter {
    /// Create a simple condition
    pub fn condition(field: &str, operator: QueryOperator, values: Vec<SqlValue>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            values,
        })
    }

    /// Create AND group
    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    /// Create OR group
    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    /// Equal condition; a NULL value compares with IS NULL
    pub fn eq(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Eq, vec![value.into()])
    }

    /// Not equal condition; a NULL value compares with IS NOT NULL
    pub fn ne(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Ne, vec![value.into()])
    }

    pub fn gt(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Gt, vec![value.into()])
    }

    pub fn gte(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Gte, vec![value.into()])
    }

    pub fn lt(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Lt, vec![value.into()])
    }

    pub fn lte(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Lte, vec![value.into()])
    }

    /// LIKE condition; `%` and `_` in `pattern` act as wildcards
    pub fn like(field: &str, pattern: &str) -> Self {
        Self::condition(
            field,
            QueryOperator::Like,
            vec![SqlValue::Text(pattern.to_string())],
        )
    }

    /// IN condition
    pub fn in_values(field: &str, values: Vec<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::In, values)
    }

    /// NOT IN condition
    pub fn not_in_values(field: &str, values: Vec<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::NotIn, values)
    }

    /// IS NULL condition
    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, Vec::new())
    }

    /// IS NOT NULL condition
    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, Vec::new())
    }
}
