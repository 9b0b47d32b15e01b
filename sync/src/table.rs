//! Per-table facade with fluent query construction.

use std::sync::Arc;

use tablesync_core::{Expr, Query, ReadResult, Row, Value, validate_table_name};

use crate::context::SyncContext;
use crate::error::{Result, SyncError};

/// A table routed through a [`SyncContext`].
///
/// The fluent operators ([`filter`](Self::filter), [`order_by`](Self::order_by),
/// ...) start a [`TableQuery`] bound to this table.
pub struct SyncTable<C: SyncContext + ?Sized> {
    name: String,
    context: Arc<C>,
}

impl<C: SyncContext + ?Sized> Clone for SyncTable<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: SyncContext + ?Sized> std::fmt::Debug for SyncTable<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTable").field("name", &self.name).finish()
    }
}

impl<C: SyncContext + ?Sized> SyncTable<C> {
    /// Creates a facade for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if `name` is empty or not a valid
    /// table name.
    pub fn new(name: impl Into<String>, context: Arc<C>) -> Result<Self> {
        let name = name.into();
        validate_table_name(&name)?;
        Ok(Self { name, context })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert(&self, record: Row) -> Result<Row> {
        self.context.insert(&self.name, record).await
    }

    pub async fn update(&self, record: Row) -> Result<()> {
        self.context.update(&self.name, record).await
    }

    pub async fn delete(&self, id: impl Into<Value>) -> Result<()> {
        self.context.delete(&self.name, id.into()).await
    }

    pub async fn lookup(&self, id: impl Into<Value>) -> Result<Option<Row>> {
        self.context.lookup(&self.name, id.into()).await
    }

    /// Reads `query`, or the whole table when `query` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TableMismatch`] if the query targets another table.
    pub async fn read(&self, query: Option<Query>) -> Result<ReadResult> {
        let query = query.unwrap_or_else(|| Query::new(&self.name));
        if query.table != self.name {
            return Err(SyncError::TableMismatch {
                expected: self.name.clone(),
                actual: query.table,
            });
        }
        self.context.read(query).await
    }

    /// Starts a query over the whole table.
    pub fn query(&self) -> TableQuery<C> {
        TableQuery {
            table: self.clone(),
            query: Query::new(&self.name),
        }
    }

    pub fn filter(&self, predicate: Expr) -> TableQuery<C> {
        self.query().filter(predicate)
    }

    pub fn select<I, S>(&self, columns: I) -> TableQuery<C>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query().select(columns)
    }

    pub fn order_by(&self, column: impl Into<String>) -> TableQuery<C> {
        self.query().order_by(column)
    }

    pub fn order_by_descending(&self, column: impl Into<String>) -> TableQuery<C> {
        self.query().order_by_descending(column)
    }

    pub fn skip(&self, count: u64) -> TableQuery<C> {
        self.query().skip(count)
    }

    pub fn take(&self, count: u64) -> TableQuery<C> {
        self.query().take(count)
    }

    pub fn include_total_count(&self) -> TableQuery<C> {
        self.query().include_total_count()
    }
}

/// A query under construction, bound to the [`SyncTable`] that started it.
pub struct TableQuery<C: SyncContext + ?Sized> {
    table: SyncTable<C>,
    query: Query,
}

impl<C: SyncContext + ?Sized> Clone for TableQuery<C> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            query: self.query.clone(),
        }
    }
}

impl<C: SyncContext + ?Sized> TableQuery<C> {
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.query = self.query.filter(predicate);
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = self.query.select(columns);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.query = self.query.order_by(column);
        self
    }

    pub fn order_by_descending(mut self, column: impl Into<String>) -> Self {
        self.query = self.query.order_by_descending(column);
        self
    }

    pub fn skip(mut self, count: u64) -> Self {
        self.query = self.query.skip(count);
        self
    }

    pub fn take(mut self, count: u64) -> Self {
        self.query = self.query.take(count);
        self
    }

    pub fn include_total_count(mut self) -> Self {
        self.query = self.query.include_total_count();
        self
    }

    /// The query built so far.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    /// Reads the query through the table's context.
    pub async fn read(&self) -> Result<ReadResult> {
        self.table.context.read(self.query.clone()).await
    }
}
