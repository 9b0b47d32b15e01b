//! Async access to a [`LocalStore`].
//!
//! The store itself is synchronous. [`StoreHandle`] shares one store behind
//! a mutex and runs each operation on tokio's blocking pool, so callers on an
//! async runtime never block their worker threads. Operations issued through
//! clones of the same handle are serialized.

use std::sync::{Arc, Mutex};

use tablesync_core::{Query, ReadResult, Row, StoreConfig, TableDefinition, Value};

use crate::database::{Database, SqliteDatabase};
use crate::error::{Result, StoreError};
use crate::migration::MigrationReport;
use crate::store::{DeleteTarget, LocalStore};

/// Cloneable async handle to a shared [`LocalStore`].
pub struct StoreHandle<D: Database + 'static = SqliteDatabase> {
    inner: Arc<Mutex<LocalStore<D>>>,
}

impl<D: Database + 'static> Clone for StoreHandle<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl StoreHandle<SqliteDatabase> {
    /// Opens a store as [`LocalStore::open_with_config`] does and wraps it.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(LocalStore::open_with_config(config)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(LocalStore::open_in_memory()?))
    }
}

impl<D: Database + 'static> StoreHandle<D> {
    pub fn new(store: LocalStore<D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs `operation` against the store on the blocking pool.
    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LocalStore<D>) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut store = inner
                .lock()
                .map_err(|_| StoreError::TaskFailed("store lock poisoned".to_string()))?;
            operation(&mut store)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }

    pub async fn define_table(&self, table: TableDefinition) -> Result<MigrationReport> {
        self.run(move |store| store.define_table(table)).await
    }

    pub async fn table_definition(&self, name: impl Into<String>) -> Result<Option<TableDefinition>> {
        let name = name.into();
        self.run(move |store| Ok(store.table_definition(&name).cloned()))
            .await
    }

    pub async fn upsert(&self, table: impl Into<String>, records: Vec<Row>) -> Result<()> {
        let table = table.into();
        self.run(move |store| store.upsert(&table, records)).await
    }

    pub async fn upsert_one(&self, table: impl Into<String>, record: Row) -> Result<()> {
        self.upsert(table, vec![record]).await
    }

    pub async fn lookup(&self, table: impl Into<String>, id: impl Into<Value>) -> Result<Option<Row>> {
        let table = table.into();
        let id = id.into();
        self.run(move |store| store.lookup(&table, id)).await
    }

    pub async fn read(&self, query: Query) -> Result<ReadResult> {
        self.run(move |store| store.read(&query)).await
    }

    pub async fn delete(&self, target: DeleteTarget) -> Result<()> {
        self.run(move |store| store.delete(target)).await
    }
}

impl<D: Database + 'static> From<LocalStore<D>> for StoreHandle<D> {
    fn from(store: LocalStore<D>) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesync_core::{ColumnType, row};

    #[tokio::test]
    async fn test_clones_share_one_store() {
        let handle = StoreHandle::open_in_memory().unwrap();
        handle
            .define_table(
                TableDefinition::new("todo")
                    .with_column("id", ColumnType::Text)
                    .with_column("text", ColumnType::Text),
            )
            .await
            .unwrap();

        let other = handle.clone();
        other
            .upsert_one("todo", row! { "id" => "a", "text" => "milk" })
            .await
            .unwrap();

        let found = handle.lookup("todo", "A").await.unwrap().unwrap();
        assert_eq!(found.get("text"), Some(&Value::from("milk")));
        assert!(handle.table_definition("todo").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let handle = StoreHandle::open_in_memory().unwrap();
        let err = handle.read(Query::new("todo")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotDefined(_)));
    }
}
