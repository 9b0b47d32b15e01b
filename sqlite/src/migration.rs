//! Table definition registry and additive schema migration.
//!
//! [`SchemaManager`] remembers the most recent definition of every table and
//! brings the physical SQLite table in line with it. Migration is additive
//! only: missing tables are created and missing columns added, while existing
//! columns are never dropped, renamed or retyped.
//!
//! # Example
//!
//! ```
//! use tablesync_core::{ColumnType, TableDefinition};
//! use tablesync_sqlite::{SchemaManager, SqliteDatabase};
//!
//! let mut db = SqliteDatabase::open_in_memory().unwrap();
//! let mut schema = SchemaManager::new();
//!
//! let todo = TableDefinition::new("todo")
//!     .with_column("id", ColumnType::Text)
//!     .with_column("text", ColumnType::Text);
//! let report = schema.define_table(&mut db, todo.clone()).unwrap();
//! assert!(report.created);
//!
//! // Redefining with an extra column only adds that column.
//! let report = schema
//!     .define_table(&mut db, todo.with_column("done", ColumnType::Boolean))
//!     .unwrap();
//! assert_eq!(report.added_columns, vec!["done"]);
//! ```

use std::collections::HashMap;

use tablesync_core::{TableDefinition, validate_table_definition, validate_table_name};
use tracing::debug;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::schema::{column_names, migration_batch, table_columns_statement};

/// What a call to [`SchemaManager::define_table`] changed in storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// The physical table did not exist and was created.
    pub created: bool,
    /// Columns added to an existing table, in declaration order.
    pub added_columns: Vec<String>,
}

impl MigrationReport {
    /// Returns `true` if the physical table was already up to date.
    pub fn is_unchanged(&self) -> bool {
        !self.created && self.added_columns.is_empty()
    }
}

/// Registry of table definitions, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct SchemaManager {
    tables: HashMap<String, TableDefinition>,
}

impl SchemaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `table`, migrates its physical table and registers it.
    ///
    /// The create/alter statements run as one batch, so a failure leaves
    /// both storage and the registry as they were. On success the definition
    /// replaces any earlier one with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a malformed definition, or
    /// [`StoreError::Storage`] if the database rejects the DDL.
    pub fn define_table<D: Database + ?Sized>(
        &mut self,
        db: &mut D,
        table: TableDefinition,
    ) -> Result<MigrationReport> {
        if let Some(error) = validate_table_definition(&table).into_iter().next() {
            return Err(error.into());
        }

        let existing = column_names(&db.execute_sql(&table_columns_statement(&table.name)?)?);
        let batch = migration_batch(&table, &existing)?;

        let report = if existing.is_empty() {
            MigrationReport {
                created: true,
                added_columns: Vec::new(),
            }
        } else {
            MigrationReport {
                created: false,
                added_columns: table
                    .column_names()
                    .filter(|name| !existing.iter().any(|e| e.eq_ignore_ascii_case(name)))
                    .map(String::from)
                    .collect(),
            }
        };

        if !batch.is_empty() {
            db.execute_batch(&batch)?;
        }
        debug!(
            table = %table.name,
            created = report.created,
            added = ?report.added_columns,
            "Defined table"
        );

        self.tables.insert(table.name.clone(), table);
        Ok(report)
    }

    /// Returns the registered definition of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    /// Returns the registered definition of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if `name` is not a valid table name
    /// and [`StoreError::NotDefined`] if no table by that name is registered.
    pub fn require(&self, name: &str) -> Result<&TableDefinition> {
        validate_table_name(name)?;
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::NotDefined(name.to_string()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterates over all registered definitions in no particular order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }
}
