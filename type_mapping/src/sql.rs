//! SQL text utilities
//!
//! Identifier quoting and string escaping. Statements are assembled as plain
//! text, so every literal must pass through here before it is embedded.
//! Backends disagree on what a backslash means inside a string literal,
//! which is why escaping depends on the [`Dialect`].

/// String literal rules of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Backslash is an escape character
    #[default]
    MySql,
    /// Backslash is an ordinary character, quotes are doubled
    Sqlite,
}

impl Dialect {
    /// Dialect of a sqlx backend name (`MySQL`, `SQLite`, ...)
    pub fn from_backend_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

/// Quote an identifier with backticks. Dotted paths are quoted per segment,
/// so `accounts.id` becomes `` `accounts`.`id` ``.
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Escape the body of a string literal.
///
/// MySQL: backslash-escape `\`, `'`, `%` and `_`, the backslash first so
/// input ending in a backslash cannot terminate the literal.
/// SQLite: double `'`; nothing else is special there.
pub fn escape_string(value: &str, dialect: Dialect) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match (dialect, c) {
            (Dialect::MySql, '\\' | '\'' | '%' | '_') => {
                escaped.push('\\');
                escaped.push(c);
            }
            (Dialect::Sqlite, '\'') => escaped.push_str("''"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape a LIKE pattern: quotes (and on MySQL backslashes) only, wildcards
/// stay live
pub fn escape_like_pattern(pattern: &str, dialect: Dialect) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        match (dialect, c) {
            (Dialect::MySql, '\\' | '\'') => {
                escaped.push('\\');
                escaped.push(c);
            }
            (Dialect::Sqlite, '\'') => escaped.push_str("''"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape and single-quote a string literal
pub fn quote_string(value: &str, dialect: Dialect) -> String {
    format!("'{}'", escape_string(value, dialect))
}
