//! SQLite local store for offline table data.
//!
//! This crate stores dynamically-typed rows in SQLite tables whose schema is
//! declared at runtime, migrating storage additively as definitions evolve.
//!
//! # Architecture
//!
//! The crate is organized into these modules:
//!
//! - **`database`**: the [`Database`] execution contract and its SQLite
//!   implementation
//! - **`schema`**: `CREATE TABLE` / `ALTER TABLE` generation
//! - **`migration`**: the [`SchemaManager`] registry of table definitions
//! - **`convert`**: typed value ↔ storage value conversion per column type
//! - **`translate`**: [`Query`](tablesync_core::Query) → parameterized SQL
//! - **`store`**: [`LocalStore`]: define, upsert, lookup, read, delete
//! - **`handle`**: [`StoreHandle`]: async access to a shared store
//!
//! # Quick start
//!
//! ```
//! use tablesync_core::{ColumnType, Query, TableDefinition, Value, row};
//! use tablesync_sqlite::LocalStore;
//!
//! let mut store = LocalStore::open_in_memory().unwrap();
//! store
//!     .define_table(
//!         TableDefinition::new("todo")
//!             .with_column("id", ColumnType::Text)
//!             .with_column("text", ColumnType::Text),
//!     )
//!     .unwrap();
//!
//! store.upsert_one("todo", &row! { "id" => "ABC", "text" => "milk" }).unwrap();
//! store.upsert_one("todo", &row! { "id" => "abc", "text" => "bread" }).unwrap();
//!
//! let rows = store.read(&Query::new("todo")).unwrap().into_rows();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get("id"), Some(&Value::from("ABC")));
//! assert_eq!(rows[0].get("text"), Some(&Value::from("bread")));
//! ```
//!
//! # Configuration
//!
//! [`LocalStore::open_with_config`] opens the database named by a
//! [`StoreConfig`](tablesync_core::StoreConfig) and defines its tables.

mod convert;
mod database;
mod error;
mod handle;
mod migration;
mod schema;
mod store;
mod translate;

pub use convert::{
    StoredRow, deserialize_row, deserialize_scalar, from_sql, serialize_row, serialize_scalar,
    to_parameter,
};
pub use database::{Database, ResultSet, SqliteDatabase, Statement, StatementBatch};
pub use error::{Result, StoreError};
pub use handle::StoreHandle;
pub use migration::{MigrationReport, SchemaManager};
pub use schema::{add_column_sql, create_table_sql, migration_batch, table_columns_statement};
pub use store::{DeleteTarget, LocalStore};
pub use translate::{TranslatedQuery, translate};
