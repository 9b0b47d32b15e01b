//! Core types for offline table storage.
//!
//! This crate defines the storage-independent model shared by the local
//! store and the sync facade:
//!
//! - [`Value`] and [`Row`]: dynamically-typed records, built with [`row!`].
//! - [`ColumnType`] / [`Affinity`]: the closed set of column domain types and
//!   the storage category each maps to.
//! - [`TableDefinition`]: a named table with ordered column declarations.
//! - [`Query`] / [`Expr`]: structured read requests with filter, projection,
//!   ordering, paging and total-count options; [`ReadResult`] is what a read
//!   returns.
//! - [`StoreConfig`]: YAML configuration naming the database and its tables.
//!
//! Validation ([`validate_table_definition`], [`validate_id`]) rejects
//! malformed input before anything touches storage.
//!
//! # Example
//!
//! ```
//! use tablesync_core::*;
//!
//! let table = TableDefinition::new("todo")
//!     .with_column("id", ColumnType::Text)
//!     .with_column("text", ColumnType::Text)
//!     .with_column("done", ColumnType::Boolean);
//! assert!(validate_table_definition(&table).is_empty());
//!
//! let item = row! { "id" => "a1", "text" => "buy milk", "done" => false };
//! assert!(validate_id(item.id().unwrap()).is_ok());
//!
//! let open_items = Query::new("todo").filter(col("done").eq(false)).order_by("text");
//! assert_eq!(open_items.table, "todo");
//! ```

mod config;
mod error;
mod query;
mod types;
mod validate;
mod value;

pub use config::{IN_MEMORY, StoreConfig};
pub use error::{ConfigError, Result};
pub use query::{
    CompareOp, Direction, Expr, OrderBy, Query, ReadResult, StringFunction, col, lit,
};
pub use types::{Affinity, ColumnDefinition, ColumnType, TableDefinition};
pub use validate::{
    ValidationError, is_identifier, validate_column_name, validate_id, validate_table_definition,
    validate_table_name,
};
pub use value::{ID_COLUMN, Row, Value, format_date};
