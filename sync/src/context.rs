//! The coordinator contract and an offline-only implementation.

use async_trait::async_trait;
use tablesync_core::{Query, ReadResult, Row, TableDefinition, ValidationError, Value, validate_id};
use tablesync_sqlite::{DeleteTarget, MigrationReport, StoreHandle};
use tracing::debug;

use crate::error::{Result, SyncError};

/// Coordinator that decides how table operations reach local storage (and,
/// in a connected client, the remote service).
///
/// [`SyncTable`](crate::SyncTable) forwards every call to its context.
#[async_trait]
pub trait SyncContext: Send + Sync {
    /// Inserts a new record, returning it as stored.
    async fn insert(&self, table: &str, record: Row) -> Result<Row>;

    /// Updates an existing record.
    async fn update(&self, table: &str, record: Row) -> Result<()>;

    /// Deletes the record with the given id.
    async fn delete(&self, table: &str, id: Value) -> Result<()>;

    async fn lookup(&self, table: &str, id: Value) -> Result<Option<Row>>;

    async fn read(&self, query: Query) -> Result<ReadResult>;
}

/// [`SyncContext`] that writes straight through to a local store, with no
/// operation queue and no remote service.
#[derive(Clone)]
pub struct LocalSyncContext {
    store: StoreHandle,
}

impl LocalSyncContext {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Defines a table in the underlying store.
    pub async fn define_table(&self, table: TableDefinition) -> Result<MigrationReport> {
        Ok(self.store.define_table(table).await?)
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }
}

/// Returns the record's id after checking it is usable as a key.
fn record_id(record: &Row) -> Result<Value> {
    let id = record.id().ok_or(ValidationError::MissingId)?;
    validate_id(id)?;
    Ok(id.clone())
}

#[async_trait]
impl SyncContext for LocalSyncContext {
    async fn insert(&self, table: &str, record: Row) -> Result<Row> {
        let id = record_id(&record)?;
        if self.store.lookup(table, id.clone()).await?.is_some() {
            return Err(SyncError::DuplicateId {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        debug!(table, id = %id, "Inserting record");
        self.store.upsert_one(table, record.clone()).await?;
        Ok(record)
    }

    async fn update(&self, table: &str, record: Row) -> Result<()> {
        let id = record_id(&record)?;
        if self.store.lookup(table, id.clone()).await?.is_none() {
            return Err(SyncError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        debug!(table, id = %id, "Updating record");
        self.store.upsert_one(table, record).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: Value) -> Result<()> {
        validate_id(&id)?;
        debug!(table, id = %id, "Deleting record");
        self.store.delete(DeleteTarget::id(table, id)).await?;
        Ok(())
    }

    async fn lookup(&self, table: &str, id: Value) -> Result<Option<Row>> {
        Ok(self.store.lookup(table, id).await?)
    }

    async fn read(&self, query: Query) -> Result<ReadResult> {
        Ok(self.store.read(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesync_core::{ColumnType, row};

    async fn context() -> LocalSyncContext {
        let context = LocalSyncContext::new(StoreHandle::open_in_memory().unwrap());
        context
            .define_table(
                TableDefinition::new("todo")
                    .with_column("id", ColumnType::Text)
                    .with_column("text", ColumnType::Text),
            )
            .await
            .unwrap();
        context
    }

    #[tokio::test]
    async fn test_insert_rejects_existing_id() {
        let context = context().await;
        context
            .insert("todo", row! { "id" => "a", "text" => "one" })
            .await
            .unwrap();
        let err = context
            .insert("todo", row! { "id" => "A", "text" => "two" })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateId { .. }));

        let found = context.lookup("todo", "a".into()).await.unwrap().unwrap();
        assert_eq!(found.get("text"), Some(&Value::from("one")));
    }

    #[tokio::test]
    async fn test_update_requires_existing_id() {
        let context = context().await;
        let err = context
            .update("todo", row! { "id" => "missing", "text" => "x" })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
        assert!(context.lookup("todo", "missing".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_requires_id() {
        let context = context().await;
        let err = context
            .insert("todo", row! { "text" => "no id" })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::MissingId)
        ));
    }

    #[tokio::test]
    async fn test_store_errors_are_wrapped() {
        let context = context().await;
        let err = context
            .read(Query::new("notes"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store(tablesync_sqlite::StoreError::NotDefined(_))
        ));
    }
}
