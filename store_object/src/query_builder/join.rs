use type_mapping::quote_identifier;

/// Represents the type of SQL JOIN operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN - returns records that have matching values in both tables
    Inner,
    /// LEFT JOIN - returns all records from the left table and matched records from the right table
    Left,
}

impl JoinType {
    /// Convert JoinType to SQL string
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// One `JOIN <table> ON <left> = <right>` clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub left_field: String,
    pub right_field: String,
}

impl JoinClause {
    pub fn new(
        join_type: JoinType,
        table: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self {
            join_type,
            table: table.into(),
            left_field: left_field.into(),
            right_field: right_field.into(),
        }
    }

    /// LEFT JOIN keeping rows of the left side without a match
    pub fn left(
        table: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self::new(JoinType::Left, table, left_field, right_field)
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} {} ON {} = {}",
            self.join_type.to_sql(),
            quote_identifier(&self.table),
            quote_identifier(&self.left_field),
            quote_identifier(&self.right_field)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_to_sql() {
        assert_eq!(JoinType::Inner.to_sql(), "INNER JOIN");
        assert_eq!(JoinType::Left.to_sql(), "LEFT JOIN");
    }

    #[test]
    fn test_join_clause_left() {
        let join = JoinClause::left("accounts_tags", "accounts.id", "accounts_tags.account_id");

        assert_eq!(join.join_type, JoinType::Left);
        assert_eq!(join.table, "accounts_tags");
        assert_eq!(
            join.to_sql(),
            "LEFT JOIN `accounts_tags` ON `accounts`.`id` = `accounts_tags`.`account_id`"
        );
    }

    #[test]
    fn test_join_clause_inner() {
        let join = JoinClause::new(JoinType::Inner, "orders", "users.id", "orders.user_id");
        assert!(join.to_sql().starts_with("INNER JOIN `orders`"));
    }
}
