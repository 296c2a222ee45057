use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::ordering::SortOrder;
use type_mapping::{escape_like_pattern, quote_identifier, Dialect, SqlValue};

/// Largest row count accepted by both MySQL and SQLite for an open-ended LIMIT
const UNBOUNDED_LIMIT: i64 = i64::MAX;

pub struct SqlGenerator;

impl SqlGenerator {
    /// Conditions joined with AND; empty when there are none
    pub fn build_condition(conditions: &[QueryFilter], dialect: Dialect) -> String {
        conditions
            .iter()
            .map(|filter| Self::build_condition_sql(filter, dialect))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Build WHERE clause from conditions
    pub fn build_where_clause(conditions: &[QueryFilter], dialect: Dialect) -> String {
        let condition = Self::build_condition(conditions, dialect);
        if condition.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", condition)
        }
    }

    fn build_condition_sql(filter: &QueryFilter, dialect: Dialect) -> String {
        match filter {
            QueryFilter::Condition(condition) => {
                Self::build_single_condition_sql(condition, dialect)
            }
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    // neutral element of the operator
                    return match operator {
                        LogicalOperator::And => "1=1".to_string(),
                        LogicalOperator::Or => "1=0".to_string(),
                    };
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|filter| Self::build_condition_sql(filter, dialect))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }

    fn build_single_condition_sql(condition: &QueryCondition, dialect: Dialect) -> String {
        let field = quote_identifier(&condition.field);
        let first = condition.values.first();

        let comparison = |symbol: &str| match first {
            Some(value) => format!("{} {} {}", field, symbol, value.to_sql_literal(dialect)),
            None => "1=0".to_string(),
        };

        match condition.operator {
            QueryOperator::Eq => match first {
                Some(SqlValue::Null) => format!("{} IS NULL", field),
                _ => comparison("="),
            },
            QueryOperator::Ne => match first {
                Some(SqlValue::Null) => format!("{} IS NOT NULL", field),
                _ => comparison("!="),
            },
            QueryOperator::Gt => comparison(">"),
            QueryOperator::Gte => comparison(">="),
            QueryOperator::Lt => comparison("<"),
            QueryOperator::Lte => comparison("<="),
            QueryOperator::Like => match first {
                Some(SqlValue::Text(pattern)) => {
                    format!("{} LIKE '{}'", field, escape_like_pattern(pattern, dialect))
                }
                _ => comparison("LIKE"),
            },
            QueryOperator::In => {
                if condition.values.is_empty() {
                    return "1=0".to_string();
                }
                format!("{} IN ({})", field, Self::literal_list(&condition.values, dialect))
            }
            QueryOperator::NotIn => {
                if condition.values.is_empty() {
                    return "1=1".to_string();
                }
                format!("{} NOT IN ({})", field, Self::literal_list(&condition.values, dialect))
            }
            QueryOperator::IsNull => format!("{} IS NULL", field),
            QueryOperator::IsNotNull => format!("{} IS NOT NULL", field),
        }
    }

    fn literal_list(values: &[SqlValue], dialect: Dialect) -> String {
        values
            .iter()
            .map(|value| value.to_sql_literal(dialect))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", quote_identifier(field), order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        match (limit, offset) {
            (None, None) => String::new(),
            (Some(limit), None) => format!("LIMIT {}", limit.max(0)),
            // OFFSET alone is not valid SQL
            (limit, Some(offset)) => format!(
                "LIMIT {} OFFSET {}",
                limit.unwrap_or(UNBOUNDED_LIMIT).max(0),
                offset.max(0)
            ),
        }
    }
}
