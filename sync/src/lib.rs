//! Per-table sync facade over the local store.
//!
//! A [`SyncTable`] is a thin wrapper that forwards inserts, updates, deletes,
//! lookups and reads for one table to a [`SyncContext`], the coordinator that
//! decides how operations reach storage. Fluent operators on the table start
//! a [`TableQuery`] whose [`read`](TableQuery::read) goes through the same
//! coordinator.
//!
//! [`LocalSyncContext`] is an offline-only coordinator writing straight
//! through a [`StoreHandle`](tablesync_sqlite::StoreHandle).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tablesync_core::{ColumnType, TableDefinition, col, row};
//! use tablesync_sqlite::StoreHandle;
//! use tablesync_sync::{LocalSyncContext, SyncTable};
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # runtime.block_on(async {
//! let context = Arc::new(LocalSyncContext::new(StoreHandle::open_in_memory().unwrap()));
//! context
//!     .define_table(
//!         TableDefinition::new("todo")
//!             .with_column("id", ColumnType::Text)
//!             .with_column("done", ColumnType::Boolean),
//!     )
//!     .await
//!     .unwrap();
//!
//! let todo = SyncTable::new("todo", context).unwrap();
//! todo.insert(row! { "id" => "a", "done" => false }).await.unwrap();
//!
//! let open = todo.filter(col("done").eq(false)).read().await.unwrap();
//! assert_eq!(open.rows().len(), 1);
//! # });
//! ```

mod context;
mod error;
mod table;

pub use context::{LocalSyncContext, SyncContext};
pub use error::{Result, SyncError};
pub use table::{SyncTable, TableQuery};
