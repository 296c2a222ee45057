//! Identifier validation
//!
//! Table and column names are embedded into statement text, so they are
//! checked once when a schema is declared.

use thiserror::Error;

/// MySQL identifier length limit
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASCADE", "CASE", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DROP", "ELSE", "EXISTS", "FALSE", "FOREIGN", "FROM", "GROUP", "HAVING", "IF",
    "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT",
    "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RENAME", "RESTRICT", "RIGHT",
    "SCHEMA", "SELECT", "SET", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE",
    "VALUES", "WHEN", "WHERE",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Identifier '{0}' must be 1 to 64 characters long")]
    Length(String),

    #[error("Identifier '{0}' must start with a letter or underscore and contain only letters, digits and underscores")]
    Malformed(String),

    #[error("Identifier '{0}' is a reserved SQL keyword")]
    Reserved(String),
}

/// A table or column name that is safe to embed between backticks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
            return Err(ValidationError::Length(name.to_string()));
        }
        let starts_well = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !starts_well || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ValidationError::Malformed(name.to_string()));
        }
        if RESERVED_WORDS.contains(&name.to_ascii_uppercase().as_str()) {
            return Err(ValidationError::Reserved(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["accounts", "accounts_tags", "AccountTags", "_private", "t1", &"a".repeat(64)] {
            assert!(Identifier::new(name).is_ok(), "rejected {}", name);
        }
    }

    #[test]
    fn test_rejects_bad_names() {
        let long = "a".repeat(65);
        let cases = [
            ("", ValidationError::Length(String::new())),
            (long.as_str(), ValidationError::Length(long.clone())),
            ("123table", ValidationError::Malformed("123table".to_string())),
            ("user`name", ValidationError::Malformed("user`name".to_string())),
            ("na%me", ValidationError::Malformed("na%me".to_string())),
            ("values", ValidationError::Reserved("values".to_string())),
        ];
        for (name, expected) in cases {
            assert_eq!(Identifier::new(name).unwrap_err(), expected);
        }
    }
}
