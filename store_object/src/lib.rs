//! Store Object - core mapping layer for Recordhaus
//!
//! Typed fields, single-table records, multi-table record groups and the
//! SQL they generate, on top of a pluggable [`Connection`].

pub mod connection;
pub mod errors;
pub mod field;
pub mod group_selector;
pub mod prelude;
pub mod query_builder;
pub mod record;
pub mod record_group;
pub mod schema;
pub mod selector;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::{Connection, Row, SqlxConnection, Transaction};
pub use errors::{ErrorKind, FieldError, StorehausError};
pub use field::{CustomCheck, Field, FieldFactory, FieldKind, FieldSpec};
pub use group_selector::RecordGroupSelector;
pub use query_builder::{QueryBuilder, QueryFilter, QueryOperator, SortOrder};
pub use record::Record;
pub use record_group::{GroupRows, RecordGroup};
pub use schema::{Category, GroupSchema, RecordSchema, MAIN_KEY, PRIMARY_KEY};
pub use selector::Selector;
pub use validation::{Identifier, ValidationError};
