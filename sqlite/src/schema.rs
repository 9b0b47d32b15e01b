//! SQL generation for table creation and additive migration.
//!
//! Every table and column name is validated as an identifier
//! (`[A-Za-z_][A-Za-z0-9_]*`) and emitted bracket-quoted (`[name]`), so
//! generated SQL never splices untrusted text.
//!
//! # Table structure
//!
//! A defined table maps to one SQLite table with one column per declared
//! column. Each column carries the SQL type of its [`Affinity`]; the `id`
//! column is additionally the primary key, compared case-insensitively:
//!
//! ```sql
//! CREATE TABLE [todo] ([id] TEXT PRIMARY KEY COLLATE NOCASE, [done] INTEGER)
//! ```
//!
//! [`Affinity`]: tablesync_core::Affinity

use tablesync_core::{
    ColumnDefinition, ID_COLUMN, TableDefinition, validate_column_name, validate_table_name,
};

use crate::database::{ResultSet, Statement, StatementBatch};
use crate::error::Result;

/// Wraps an already-validated identifier in brackets.
pub(crate) fn quote(identifier: &str) -> String {
    format!("[{identifier}]")
}

/// Generates the `CREATE TABLE` statement for a table definition.
///
/// # Errors
///
/// Returns [`StoreError::Validation`](crate::StoreError::Validation) if the
/// table or any column name is not a valid identifier.
pub fn create_table_sql(table: &TableDefinition) -> Result<String> {
    validate_table_name(&table.name)?;

    let mut columns = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        validate_column_name(&column.name)?;
        let mut sql = format!(
            "{} {}",
            quote(&column.name),
            column.column_type.affinity().as_sql()
        );
        if column.name == ID_COLUMN {
            sql.push_str(" PRIMARY KEY COLLATE NOCASE");
        }
        columns.push(sql);
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        quote(&table.name),
        columns.join(", ")
    ))
}

/// Generates the `ALTER TABLE ... ADD COLUMN` statement for one column.
pub fn add_column_sql(table_name: &str, column: &ColumnDefinition) -> Result<String> {
    validate_table_name(table_name)?;
    validate_column_name(&column.name)?;
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote(table_name),
        quote(&column.name),
        column.column_type.affinity().as_sql()
    ))
}

/// Returns a statement listing the physical columns of a table.
///
/// The result set holds one row per column with the column name first; a
/// table that does not exist yields no rows.
pub fn table_columns_statement(table_name: &str) -> Result<Statement> {
    validate_table_name(table_name)?;
    Ok(Statement::with_params(
        "SELECT name FROM pragma_table_info(?)",
        vec![table_name.to_string().into()],
    ))
}

/// Extracts column names from the result of [`table_columns_statement`].
pub fn column_names(result: &ResultSet) -> Vec<String> {
    (0..result.len())
        .filter_map(|index| result.row(index))
        .filter_map(|row| match row.into_iter().next() {
            Some((_, rusqlite::types::Value::Text(name))) => Some(name),
            _ => None,
        })
        .collect()
}

/// Builds the DDL that brings a physical table in line with `table`.
///
/// With no existing columns the table is created; otherwise one
/// `ADD COLUMN` statement is emitted per declared column missing from
/// `existing` (compared case-insensitively). Existing columns are never
/// altered or dropped, so the batch is empty when nothing is missing.
pub fn migration_batch(table: &TableDefinition, existing: &[String]) -> Result<StatementBatch> {
    let mut batch = StatementBatch::new();
    if existing.is_empty() {
        batch.push(Statement::new(create_table_sql(table)?));
        return Ok(batch);
    }

    for column in &table.columns {
        let present = existing
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&column.name));
        if !present {
            batch.push(Statement::new(add_column_sql(&table.name, column)?));
        }
    }
    Ok(batch)
}
