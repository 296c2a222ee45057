//! Typed, validated column values
//!
//! A [`FieldSpec`] declares a column once per schema; every record gets its
//! own [`Field`] instances produced from those specs.

use crate::errors::{FieldError, StorehausError};
use chrono::{NaiveDate, NaiveDateTime};
use config::FieldDefaults;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use type_mapping::{format_timestamp, parse_timestamp, Dialect, SqlValue};

/// Extra predicate evaluated against every non-null candidate value
pub type CustomCheck = Arc<dyn Fn(&SqlValue) -> bool + Send + Sync>;

/// Type of a field together with its type-specific constraints
#[derive(Debug, Clone)]
pub enum FieldKind {
    Numeric {
        min: i64,
        max: i64,
    },
    Text {
        min_length: i64,
        max_length: i64,
        pattern: Option<Regex>,
    },
    DateTime {
        low: NaiveDateTime,
        high: NaiveDateTime,
    },
    Boolean,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Numeric { .. } => "integer",
            FieldKind::Text { .. } => "string",
            FieldKind::DateTime { .. } => "datetime",
            FieldKind::Boolean => "boolean",
        }
    }
}

fn default_datetime_low() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

fn default_datetime_high() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Declarative description of one column
///
/// Builder methods that do not apply to the field's kind (a length range on
/// a numeric field, an invalid pattern, an inverted range) are remembered and
/// reported when the field is added to a schema.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    sql_type: String,
    kind: FieldKind,
    nullable: bool,
    mutable: bool,
    custom_check: Option<CustomCheck>,
    misconfigured: Option<String>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("sql_type", &self.sql_type)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("mutable", &self.mutable)
            .field("custom_check", &self.custom_check.is_some())
            .finish()
    }
}

impl FieldSpec {
    fn with_kind(name: &str, sql_type: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            kind,
            nullable: false,
            mutable: true,
            custom_check: None,
            misconfigured: None,
        }
    }

    /// Integer column, `INT`, range `-i64::MAX..=i64::MAX`
    pub fn numeric(name: &str) -> Self {
        Self::with_kind(
            name,
            "INT",
            FieldKind::Numeric {
                min: -i64::MAX,
                max: i64::MAX,
            },
        )
    }

    /// String column, `VARCHAR(45)`, no length limit
    pub fn string(name: &str) -> Self {
        Self::with_kind(
            name,
            "VARCHAR(45)",
            FieldKind::Text {
                min_length: 0,
                max_length: i64::MAX,
                pattern: None,
            },
        )
    }

    /// Datetime column bounded by the MySQL `DATETIME` range
    pub fn datetime(name: &str) -> Self {
        Self::with_kind(
            name,
            "DATETIME",
            FieldKind::DateTime {
                low: default_datetime_low(),
                high: default_datetime_high(),
            },
        )
    }

    pub fn boolean(name: &str) -> Self {
        Self::with_kind(name, "BOOL", FieldKind::Boolean)
    }

    fn misconfigure(&mut self, reason: String) {
        if self.misconfigured.is_none() {
            self.misconfigured = Some(format!("field '{}': {}", self.name, reason));
        }
    }

    pub fn sql_type(mut self, sql_type: &str) -> Self {
        self.sql_type = sql_type.to_string();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Whether the value may change once it has been set
    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn custom_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&SqlValue) -> bool + Send + Sync + 'static,
    {
        self.custom_check = Some(Arc::new(check));
        self
    }

    /// Inclusive value range of a numeric field
    pub fn range(mut self, min: i64, max: i64) -> Self {
        let problem = match &mut self.kind {
            FieldKind::Numeric { min: lo, max: hi } if min <= max => {
                *lo = min;
                *hi = max;
                None
            }
            FieldKind::Numeric { .. } => Some(format!("min {} > max {}", min, max)),
            other => Some(format!("value range on a {} field", other.type_name())),
        };
        if let Some(reason) = problem {
            self.misconfigure(reason);
        }
        self
    }

    /// Inclusive length range of a string field, counted in characters
    pub fn length(mut self, min: i64, max: i64) -> Self {
        let problem = match &mut self.kind {
            FieldKind::Text {
                min_length,
                max_length,
                ..
            } if 0 <= min && min <= max => {
                *min_length = min;
                *max_length = max;
                None
            }
            FieldKind::Text { .. } => Some(format!("invalid length range {} - {}", min, max)),
            other => Some(format!("length range on a {} field", other.type_name())),
        };
        if let Some(reason) = problem {
            self.misconfigure(reason);
        }
        self
    }

    /// Regular expression a string value must match
    pub fn pattern(mut self, pattern: &str) -> Self {
        let problem = match &mut self.kind {
            FieldKind::Text { pattern: slot, .. } => match Regex::new(pattern) {
                Ok(regex) => {
                    *slot = Some(regex);
                    None
                }
                Err(e) => Some(format!("bad pattern: {}", e)),
            },
            other => Some(format!("pattern on a {} field", other.type_name())),
        };
        if let Some(reason) = problem {
            self.misconfigure(reason);
        }
        self
    }

    /// Inclusive bounds of a datetime field
    pub fn datetime_range(mut self, low: NaiveDateTime, high: NaiveDateTime) -> Self {
        let problem = match &mut self.kind {
            FieldKind::DateTime { low: lo, high: hi } if low <= high => {
                *lo = low;
                *hi = high;
                None
            }
            FieldKind::DateTime { .. } => Some("low bound after high bound".to_string()),
            other => Some(format!("datetime range on a {} field", other.type_name())),
        };
        if let Some(reason) = problem {
            self.misconfigure(reason);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &str {
        &self.sql_type
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub(crate) fn misconfiguration(&self) -> Option<&str> {
        self.misconfigured.as_deref()
    }

    /// Fresh, uninitialized field for one record
    pub fn instantiate(self: &Arc<Self>) -> Field {
        Field {
            spec: Arc::clone(self),
            value: SqlValue::Null,
            initialized: false,
        }
    }

    /// Type-specific check; returns the candidate normalized to the
    /// field's native representation
    fn check_type(&self, candidate: SqlValue) -> Result<SqlValue, FieldError> {
        let mismatch = |actual: &SqlValue| FieldError::TypeMismatch {
            field: self.name.clone(),
            expected: self.kind.type_name(),
            actual: actual.type_name(),
        };

        match &self.kind {
            FieldKind::Numeric { min, max } => {
                let value = match &candidate {
                    SqlValue::Integer(v) => *v,
                    SqlValue::Text(s) => s.trim().parse::<i64>().map_err(|_| mismatch(&candidate))?,
                    other => return Err(mismatch(other)),
                };
                if value < *min || value > *max {
                    return Err(FieldError::OutOfRange {
                        field: self.name.clone(),
                        value,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(SqlValue::Integer(value))
            }
            FieldKind::Text {
                min_length,
                max_length,
                pattern,
            } => {
                let text = match candidate {
                    SqlValue::Text(s) => s,
                    SqlValue::Integer(v) => v.to_string(),
                    other => return Err(mismatch(&other)),
                };
                let length = text.chars().count() as i64;
                if length < *min_length || length > *max_length {
                    return Err(FieldError::LengthOutOfRange {
                        field: self.name.clone(),
                        length,
                        min: *min_length,
                        max: *max_length,
                    });
                }
                if let Some(regex) = pattern {
                    if !regex.is_match(&text) {
                        return Err(FieldError::PatternMismatch {
                            field: self.name.clone(),
                            pattern: regex.as_str().to_string(),
                        });
                    }
                }
                Ok(SqlValue::Text(text))
            }
            FieldKind::DateTime { low, high } => {
                let ts = match &candidate {
                    SqlValue::Timestamp(ts) => *ts,
                    SqlValue::Text(s) => {
                        parse_timestamp(s).ok_or_else(|| FieldError::InvalidDatetime {
                            field: self.name.clone(),
                            value: s.clone(),
                        })?
                    }
                    other => return Err(mismatch(other)),
                };
                if ts < *low || ts > *high {
                    return Err(FieldError::DatetimeOutOfRange {
                        field: self.name.clone(),
                        value: format_timestamp(&ts),
                        low: format_timestamp(low),
                        high: format_timestamp(high),
                    });
                }
                Ok(SqlValue::Timestamp(ts))
            }
            FieldKind::Boolean => match candidate {
                SqlValue::Boolean(b) => Ok(SqlValue::Boolean(b)),
                SqlValue::Integer(0) => Ok(SqlValue::Boolean(false)),
                SqlValue::Integer(1) => Ok(SqlValue::Boolean(true)),
                other => Err(mismatch(&other)),
            },
        }
    }
}

/// Creates field specs with configured defaults applied
#[derive(Debug, Clone)]
pub struct FieldFactory {
    defaults: FieldDefaults,
    datetime_low: NaiveDateTime,
    datetime_high: NaiveDateTime,
}

impl FieldFactory {
    pub fn new(defaults: &FieldDefaults) -> Result<Self, StorehausError> {
        defaults
            .validate()
            .map_err(|e| StorehausError::InvalidSchema(e.to_string()))?;
        let datetime_low = defaults
            .datetime_low()
            .map_err(|e| StorehausError::InvalidSchema(e.to_string()))?;
        let datetime_high = defaults
            .datetime_high()
            .map_err(|e| StorehausError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            defaults: defaults.clone(),
            datetime_low,
            datetime_high,
        })
    }

    pub fn defaults(&self) -> &FieldDefaults {
        &self.defaults
    }

    fn apply(&self, spec: FieldSpec) -> FieldSpec {
        spec.nullable(self.defaults.can_null)
            .mutable(self.defaults.can_change)
    }

    pub fn numeric(&self, name: &str) -> FieldSpec {
        self.apply(FieldSpec::numeric(name).sql_type(&self.defaults.int_type))
    }

    pub fn string(&self, name: &str) -> FieldSpec {
        self.apply(
            FieldSpec::string(name)
                .sql_type(&self.defaults.str_type)
                .length(self.defaults.str_min_length, self.defaults.str_max_length),
        )
    }

    pub fn datetime(&self, name: &str) -> FieldSpec {
        self.apply(
            FieldSpec::datetime(name)
                .sql_type(&self.defaults.datetime_type)
                .datetime_range(self.datetime_low, self.datetime_high),
        )
    }

    pub fn boolean(&self, name: &str) -> FieldSpec {
        self.apply(FieldSpec::boolean(name).sql_type(&self.defaults.bool_type))
    }
}

impl Default for FieldFactory {
    fn default() -> Self {
        Self {
            defaults: FieldDefaults::default(),
            datetime_low: default_datetime_low(),
            datetime_high: default_datetime_high(),
        }
    }
}

/// One column value of one record
#[derive(Debug, Clone)]
pub struct Field {
    spec: Arc<FieldSpec>,
    value: SqlValue,
    initialized: bool,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run every rule against `candidate` without assigning it.
    ///
    /// Type checks come first, then immutability, nullability and the
    /// custom check.
    pub fn check(&self, candidate: SqlValue) -> Result<SqlValue, FieldError> {
        let candidate = if candidate.is_null() {
            candidate
        } else {
            self.spec.check_type(candidate)?
        };

        if !self.spec.mutable && self.initialized {
            return Err(FieldError::Immutable {
                field: self.spec.name.clone(),
            });
        }

        if candidate.is_null() {
            if !self.spec.nullable {
                return Err(FieldError::NotNullable {
                    field: self.spec.name.clone(),
                });
            }
        } else if let Some(check) = &self.spec.custom_check {
            if !check(&candidate) {
                return Err(FieldError::CustomCheck {
                    field: self.spec.name.clone(),
                });
            }
        }

        Ok(candidate)
    }

    pub fn set_value(&mut self, candidate: impl Into<SqlValue>) -> Result<(), FieldError> {
        let value = self.check(candidate.into())?;
        self.assign(value);
        Ok(())
    }

    /// Store an already checked value
    pub(crate) fn assign(&mut self, value: SqlValue) {
        self.value = value;
        self.initialized = true;
    }

    pub fn value(&self) -> Result<&SqlValue, FieldError> {
        if !self.initialized {
            return Err(FieldError::NotInitialized {
                field: self.spec.name.clone(),
            });
        }
        Ok(&self.value)
    }

    /// Value rendered for embedding into SQL text
    pub fn sql_literal(&self, dialect: Dialect) -> Result<String, FieldError> {
        self.value().map(|value| value.to_sql_literal(dialect))
    }
}
