//! Query builder utilities
//!
//! Composes WHERE/ORDER BY/LIMIT text. Values are inlined as escaped
//! literals since statements are sent as plain text.

pub mod builder;
pub mod filter;
pub mod join;
pub mod ordering;
pub mod sql_generation;


pub use builder::QueryBuilder;
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use join::{JoinClause, JoinType};
pub use ordering::SortOrder;
