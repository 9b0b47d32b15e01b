//! Input validation for table definitions, identifiers and record ids.
//!
//! Everything here runs before any statement is issued, so a rejected input
//! never causes a partial schema change or write.
//!
//! # Examples
//!
//! ```
//! use tablesync_core::*;
//!
//! let table = TableDefinition::new("todo").with_column("id", ColumnType::Text);
//! assert!(validate_table_definition(&table).is_empty());
//!
//! // Missing id column
//! let bad = TableDefinition::new("todo").with_column("text", ColumnType::Text);
//! assert_eq!(
//!     validate_table_definition(&bad),
//!     vec![ValidationError::MissingIdColumn("todo".into())]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::types::TableDefinition;
use crate::value::Value;

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table name is empty.
    #[error("table name cannot be empty")]
    EmptyTableName,
    /// Table name is not a plain identifier.
    #[error("invalid table name: {0}")]
    InvalidTableName(String),
    /// Column name is not a plain identifier.
    #[error("invalid column name: {0}")]
    InvalidColumnName(String),
    /// Two columns in the same definition share a name (case-insensitively).
    #[error("duplicate column in table definition: {0}")]
    DuplicateColumn(String),
    /// The table does not declare an `id` column.
    #[error("table definition for '{0}' must declare an id column")]
    MissingIdColumn(String),
    /// Column type name is not one of the supported types.
    #[error("unsupported column type: '{0}'")]
    UnsupportedColumnType(String),
    /// A record id is null, empty, structural or otherwise unusable.
    #[error("invalid id {value} of type {kind}")]
    InvalidId { value: String, kind: &'static str },
    /// A record has no `id` property.
    #[error("record is missing an id")]
    MissingId,
    /// A JSON document that must be an object is not.
    #[error("expected an object, found: {0}")]
    NotAnObject(String),
}

/// Returns `true` if `name` is a plain SQL identifier:
/// an ASCII letter or underscore followed by ASCII alphanumerics or underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a table name.
pub fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyTableName);
    }
    if !is_identifier(name) {
        return Err(ValidationError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// Validates a column name.
pub fn validate_column_name(name: &str) -> Result<(), ValidationError> {
    if !is_identifier(name) {
        return Err(ValidationError::InvalidColumnName(name.to_string()));
    }
    Ok(())
}

/// Validates a table definition, returning every problem found.
///
/// Checks the table name, each column name, duplicate columns and the
/// presence of the `id` column. An empty result means the definition is valid.
pub fn validate_table_definition(table: &TableDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_table_name(&table.name) {
        errors.push(e);
    }

    let mut seen = HashSet::new();
    for column in &table.columns {
        if let Err(e) = validate_column_name(&column.name) {
            errors.push(e);
            continue;
        }
        if !seen.insert(column.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateColumn(column.name.clone()));
        }
    }

    if !table.has_id_column() {
        errors.push(ValidationError::MissingIdColumn(table.name.clone()));
    }

    errors
}

/// Validates a record id.
///
/// Valid ids are non-empty text, integers, finite reals, booleans and dates.
/// Null, structural values and empty text are rejected.
pub fn validate_id(id: &Value) -> Result<(), ValidationError> {
    let valid = match id {
        Value::Text(s) => !s.is_empty(),
        Value::Integer(_) | Value::Bool(_) | Value::Date(_) => true,
        Value::Real(f) => f.is_finite(),
        Value::Null | Value::Object(_) | Value::Array(_) => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidId {
            value: id.to_string(),
            kind: id.kind(),
        })
    }
}
