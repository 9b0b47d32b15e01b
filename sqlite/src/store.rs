//! The local store: typed, schema-migrating table storage on SQLite.
//!
//! [`LocalStore`] ties the pieces together. Table definitions go through the
//! [`SchemaManager`]; records are serialized with the row serializer and
//! written with insert-or-update statements; queries are translated to SQL
//! and their rows deserialized on the way back. Every mutation runs as one
//! [`StatementBatch`], so it either fully applies or leaves storage
//! untouched.
//!
//! # Example
//!
//! ```
//! use tablesync_core::{ColumnType, Query, TableDefinition, col, row};
//! use tablesync_sqlite::{DeleteTarget, LocalStore};
//!
//! let mut store = LocalStore::open_in_memory().unwrap();
//! store
//!     .define_table(
//!         TableDefinition::new("todo")
//!             .with_column("id", ColumnType::Text)
//!             .with_column("text", ColumnType::Text)
//!             .with_column("done", ColumnType::Boolean),
//!     )
//!     .unwrap();
//!
//! store
//!     .upsert(
//!         "todo",
//!         [
//!             row! { "id" => "a", "text" => "milk", "done" => false },
//!             row! { "id" => "b", "text" => "bread", "done" => true },
//!         ],
//!     )
//!     .unwrap();
//!
//! let open = store
//!     .read(&Query::new("todo").filter(col("done").eq(false)))
//!     .unwrap();
//! assert_eq!(open.rows().len(), 1);
//!
//! store.delete(DeleteTarget::id("todo", "A")).unwrap();
//! assert!(store.lookup("todo", "a").unwrap().is_none());
//! ```

use std::borrow::Borrow;
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use tablesync_core::{
    ColumnType, ID_COLUMN, Query, ReadResult, Row, StoreConfig, TableDefinition, ValidationError,
    Value, validate_column_name, validate_id,
};
use tracing::debug;

use crate::convert::{StoredRow, deserialize_row, serialize_row, serialize_scalar, to_parameter};
use crate::database::{Database, ResultSet, SqliteDatabase, Statement, StatementBatch};
use crate::error::{Result, StoreError};
use crate::migration::{MigrationReport, SchemaManager};
use crate::schema::quote;
use crate::translate::translate;

/// Largest number of ids bound in one `DELETE ... IN (...)` statement.
const MAX_IDS_PER_DELETE: usize = 500;

/// What to remove in a [`LocalStore::delete`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// Rows whose id matches one of `ids`, case-insensitively for text.
    /// Null ids are ignored.
    ByIds { table: String, ids: Vec<Value> },
    /// Exactly the rows the query selects, honoring its filter, ordering
    /// and paging. Any projection is ignored.
    ByQuery(Query),
}

impl DeleteTarget {
    pub fn id(table: impl Into<String>, id: impl Into<Value>) -> Self {
        DeleteTarget::ByIds {
            table: table.into(),
            ids: vec![id.into()],
        }
    }

    pub fn ids<I, V>(table: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        DeleteTarget::ByIds {
            table: table.into(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn query(query: Query) -> Self {
        DeleteTarget::ByQuery(query)
    }
}

/// Local table storage over a [`Database`].
///
/// All operations require the target table to have been defined with
/// [`define_table`](Self::define_table) on this store; otherwise they fail
/// with [`StoreError::NotDefined`].
pub struct LocalStore<D: Database = SqliteDatabase> {
    db: D,
    schema: SchemaManager,
}

impl LocalStore<SqliteDatabase> {
    /// Opens (or creates) a store backed by the SQLite file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "Opening local store");
        Ok(Self::new(SqliteDatabase::open(path)?))
    }

    /// Opens a store backed by a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(SqliteDatabase::open_in_memory()?))
    }

    /// Opens the database named by `config` and defines every configured
    /// table, in order.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        let mut store = if config.is_in_memory() {
            Self::open_in_memory()?
        } else {
            Self::open(&config.database)?
        };
        for table in &config.tables {
            store.define_table(table.clone())?;
        }
        Ok(store)
    }
}

impl<D: Database> LocalStore<D> {
    /// Creates a store over an already-open database with no tables defined.
    pub fn new(db: D) -> Self {
        Self {
            db,
            schema: SchemaManager::new(),
        }
    }

    /// Defines (or redefines) a table and migrates its storage additively.
    ///
    /// See [`SchemaManager::define_table`].
    pub fn define_table(&mut self, table: TableDefinition) -> Result<MigrationReport> {
        self.schema.define_table(&mut self.db, table)
    }

    /// Returns the current definition of `name`, if defined.
    pub fn table_definition(&self, name: &str) -> Option<&TableDefinition> {
        self.schema.get(name)
    }

    /// Inserts or updates records by id.
    ///
    /// A record whose id (compared case-insensitively for text) is new is
    /// inserted; otherwise the stored row's columns named by the record are
    /// overwritten and all other columns are left as they were. All records
    /// are written in one batch.
    ///
    /// # Errors
    ///
    /// Fails before touching storage if any record lacks a valid id, names
    /// an undeclared column, or holds a value its column type cannot store.
    pub fn upsert<I>(&mut self, table: &str, records: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Row>,
    {
        let definition = self.schema.require(table)?;

        let mut batch = StatementBatch::new();
        let mut count = 0usize;
        for record in records {
            let record = record.borrow();
            let id = record.id().ok_or(ValidationError::MissingId)?;
            validate_id(id)?;
            let stored = serialize_row(record, definition)?;
            batch.push(insert_or_ignore(table, &stored));
            if let Some(update) = update_by_id(table, stored) {
                batch.push(update);
            }
            count += 1;
        }

        if batch.is_empty() {
            return Ok(());
        }
        debug!(table, records = count, statements = batch.len(), "Upserting records");
        self.db.execute_batch(&batch)?;
        Ok(())
    }

    /// Inserts or updates a single record. See [`upsert`](Self::upsert).
    pub fn upsert_one(&mut self, table: &str, record: &Row) -> Result<()> {
        self.upsert(table, [record])
    }

    /// Returns the row whose id matches `id`, case-insensitively for text.
    pub fn lookup(&mut self, table: &str, id: impl Into<Value>) -> Result<Option<Row>> {
        let id = id.into();
        let definition = self.schema.require(table)?;
        validate_id(&id)?;

        let statement = Statement::with_params(
            format!(
                "SELECT * FROM {} WHERE {} = ? COLLATE NOCASE",
                quote(table),
                quote(ID_COLUMN)
            ),
            vec![id_parameter(&id, definition)?],
        );
        debug!(table, id = %id, "Looking up record");
        let result = self.db.execute_sql(&statement)?;
        result
            .into_rows()
            .next()
            .map(|row| deserialize_row(row, definition))
            .transpose()
    }

    /// Runs a query, returning its rows and, if requested, the number of
    /// rows matching the filter regardless of paging.
    ///
    /// The data and count statements run in one transaction, so the count
    /// is consistent with the rows.
    pub fn read(&mut self, query: &Query) -> Result<ReadResult> {
        let definition = self.schema.require(&query.table)?;
        let translated = translate(query)?;
        let with_count = translated.has_count();
        let batch = translated.into_batch();

        debug!(table = %query.table, with_count, "Reading records");
        let results = self.db.execute_batch(&batch)?;
        if results.len() != batch.len() {
            return Err(StoreError::UnexpectedStatementCount {
                expected: batch.len(),
                actual: results.len(),
            });
        }

        let mut results = results.into_iter();
        let data = results.next().unwrap_or_default();
        let rows = data
            .into_rows()
            .map(|row| deserialize_row(row, definition))
            .collect::<Result<Vec<_>>>()?;

        if !with_count {
            return Ok(ReadResult::Rows(rows));
        }
        let count = total_count(&results.next().unwrap_or_default())?;
        Ok(ReadResult::WithCount {
            result: rows,
            count,
        })
    }

    /// Deletes rows by id or by query. All deletions run in one batch.
    pub fn delete(&mut self, target: DeleteTarget) -> Result<()> {
        match target {
            DeleteTarget::ByIds { table, ids } => self.delete_by_ids(&table, &ids),
            DeleteTarget::ByQuery(query) => self.delete_by_query(&query),
        }
    }

    fn delete_by_ids(&mut self, table: &str, ids: &[Value]) -> Result<()> {
        let definition = self.schema.require(table)?;

        let ids: Vec<&Value> = ids.iter().filter(|id| !id.is_null()).collect();
        for id in &ids {
            validate_id(id)?;
        }
        if ids.is_empty() {
            return Ok(());
        }
        let params = ids
            .iter()
            .map(|id| id_parameter(id, definition))
            .collect::<Result<Vec<_>>>()?;

        let batch: StatementBatch = params
            .chunks(MAX_IDS_PER_DELETE)
            .map(|chunk| {
                let placeholders = vec!["?"; chunk.len()].join(", ");
                Statement::with_params(
                    format!(
                        "DELETE FROM {} WHERE {} COLLATE NOCASE IN ({placeholders})",
                        quote(table),
                        quote(ID_COLUMN)
                    ),
                    chunk.to_vec(),
                )
            })
            .collect();

        debug!(table, ids = ids.len(), "Deleting records by id");
        self.db.execute_batch(&batch)?;
        Ok(())
    }

    fn delete_by_query(&mut self, query: &Query) -> Result<()> {
        self.schema.require(&query.table)?;

        // Resolve candidate rows with the query's own paging, matching later
        // on their stored values so exactly those rows are removed.
        let translated = translate(&query.without_selections())?;
        let candidates = self.db.execute_sql(translated.data())?;

        let mut batch = StatementBatch::new();
        for row in candidates.into_rows() {
            if let Some(statement) = delete_matching(&query.table, row)? {
                batch.push(statement);
            }
        }

        if batch.is_empty() {
            return Ok(());
        }
        debug!(table = %query.table, rows = batch.len(), "Deleting records by query");
        self.db.execute_batch(&batch)?;
        Ok(())
    }
}

/// Converts an id to the form `upsert` stores it in, using the declared type
/// of the id column.
///
/// Text ids that do not convert to a numeric id column are bound as text and
/// compared through the column's affinity, so `"51"` still finds `51`.
fn id_parameter(id: &Value, definition: &TableDefinition) -> Result<SqlValue> {
    let Some(column_type) = definition.column_type(ID_COLUMN) else {
        return Ok(to_parameter(id));
    };
    match serialize_scalar(id, column_type) {
        Ok(value) => Ok(value),
        Err(_) if matches!(id, Value::Text(_)) && column_type != ColumnType::Text => {
            Ok(to_parameter(id))
        }
        Err(_) => Err(ValidationError::InvalidId {
            value: id.to_string(),
            kind: id.kind(),
        }
        .into()),
    }
}

/// `INSERT OR IGNORE` of every serialized column.
fn insert_or_ignore(table: &str, stored: &StoredRow) -> Statement {
    let columns: Vec<String> = stored.iter().map(|(column, _)| quote(column)).collect();
    let placeholders = vec!["?"; stored.len()].join(", ");
    Statement::with_params(
        format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({placeholders})",
            quote(table),
            columns.join(", ")
        ),
        stored.iter().map(|(_, value)| value.clone()).collect(),
    )
}

/// `UPDATE` of every non-id column, or `None` when the row holds only its id.
fn update_by_id(table: &str, stored: StoredRow) -> Option<Statement> {
    let mut id = SqlValue::Null;
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (column, value) in stored {
        if column == ID_COLUMN {
            id = value;
        } else {
            assignments.push(format!("{} = ?", quote(&column)));
            params.push(value);
        }
    }
    if assignments.is_empty() {
        return None;
    }
    params.push(id);
    Some(Statement::with_params(
        format!(
            "UPDATE {} SET {} WHERE {} = ? COLLATE NOCASE",
            quote(table),
            assignments.join(", "),
            quote(ID_COLUMN)
        ),
        params,
    ))
}

/// `DELETE` matching every stored column value of `row`.
fn delete_matching(table: &str, row: StoredRow) -> Result<Option<Statement>> {
    let mut clauses = Vec::with_capacity(row.len());
    let mut params = Vec::with_capacity(row.len());
    for (column, value) in row {
        validate_column_name(&column)?;
        clauses.push(format!("{} IS ?", quote(&column)));
        params.push(value);
    }
    if clauses.is_empty() {
        return Ok(None);
    }
    Ok(Some(Statement::with_params(
        format!("DELETE FROM {} WHERE {}", quote(table), clauses.join(" AND ")),
        params,
    )))
}

fn total_count(result: &ResultSet) -> Result<u64> {
    match result.scalar() {
        Some(SqlValue::Integer(n)) if *n >= 0 => Ok(*n as u64),
        other => Err(StoreError::Deserialization {
            value: format!("{other:?}"),
            kind: "count",
            target: "integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesync_core::{ColumnType, col, row};

    fn store() -> LocalStore {
        let mut store = LocalStore::open_in_memory().unwrap();
        store
            .define_table(
                TableDefinition::new("todo")
                    .with_column("id", ColumnType::Text)
                    .with_column("text", ColumnType::Text)
                    .with_column("done", ColumnType::Boolean),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_insert_or_ignore_sql() {
        let stored = vec![
            ("id".to_string(), SqlValue::Text("a".into())),
            ("text".to_string(), SqlValue::Text("milk".into())),
        ];
        let statement = insert_or_ignore("todo", &stored);
        assert_eq!(
            statement.sql,
            "INSERT OR IGNORE INTO [todo] ([id], [text]) VALUES (?, ?)"
        );
        assert_eq!(statement.params.len(), 2);
    }

    #[test]
    fn test_update_by_id_sql() {
        let stored = vec![
            ("text".to_string(), SqlValue::Text("milk".into())),
            ("id".to_string(), SqlValue::Text("a".into())),
            ("done".to_string(), SqlValue::Integer(0)),
        ];
        let statement = update_by_id("todo", stored).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE [todo] SET [text] = ?, [done] = ? WHERE [id] = ? COLLATE NOCASE"
        );
        assert_eq!(
            statement.params,
            vec![
                SqlValue::Text("milk".into()),
                SqlValue::Integer(0),
                SqlValue::Text("a".into()),
            ]
        );
    }

    #[test]
    fn test_update_skipped_for_id_only_row() {
        let stored = vec![("id".to_string(), SqlValue::Text("a".into()))];
        assert!(update_by_id("todo", stored).is_none());
    }

    #[test]
    fn test_delete_matching_sql() {
        let row = vec![
            ("id".to_string(), SqlValue::Text("a".into())),
            ("done".to_string(), SqlValue::Null),
        ];
        let statement = delete_matching("todo", row).unwrap().unwrap();
        assert_eq!(
            statement.sql,
            "DELETE FROM [todo] WHERE [id] IS ? AND [done] IS ?"
        );
    }

    #[test]
    fn test_upsert_requires_id() {
        let mut store = store();
        let err = store
            .upsert_one("todo", &row! { "text" => "no id" })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingId)
        ));
    }

    #[test]
    fn test_operations_on_undefined_table() {
        let mut store = store();
        assert!(matches!(
            store.upsert_one("notes", &row! { "id" => "a" }),
            Err(StoreError::NotDefined(_))
        ));
        assert!(matches!(
            store.lookup("notes", "a"),
            Err(StoreError::NotDefined(_))
        ));
        assert!(matches!(
            store.read(&Query::new("notes")),
            Err(StoreError::NotDefined(_))
        ));
        assert!(matches!(
            store.delete(DeleteTarget::id("notes", "a")),
            Err(StoreError::NotDefined(_))
        ));
    }

    #[test]
    fn test_delete_by_ids_skips_nulls() {
        let mut store = store();
        store
            .upsert("todo", [row! { "id" => "a" }, row! { "id" => "b" }])
            .unwrap();
        store
            .delete(DeleteTarget::ids("todo", [Value::Null, Value::from("B")]))
            .unwrap();
        assert!(store.lookup("todo", "a").unwrap().is_some());
        assert!(store.lookup("todo", "b").unwrap().is_none());

        store
            .delete(DeleteTarget::ids("todo", [Value::Null]))
            .unwrap();
        assert!(store.lookup("todo", "a").unwrap().is_some());
    }

    #[test]
    fn test_read_count_without_paging_effect() {
        let mut store = store();
        store
            .upsert(
                "todo",
                (0..5).map(|i| row! { "id" => format!("t{i}"), "done" => i % 2 == 0 }),
            )
            .unwrap();
        let result = store
            .read(
                &Query::new("todo")
                    .filter(col("done").eq(true))
                    .take(1)
                    .include_total_count(),
            )
            .unwrap();
        assert_eq!(result.rows().len(), 1);
        assert_eq!(result.count(), Some(3));
    }
}
