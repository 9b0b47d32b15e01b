//! Column types and table definitions.
//!
//! [`ColumnType`] is the closed set of domain types a column may declare.
//! Several types share a name with an alias (`string`/`text`, `int`/`integer`,
//! `float`/`real`, `bool`/`boolean`); the alias resolves to the same variant
//! when parsed. Each type maps to exactly one storage [`Affinity`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;
use crate::value::ID_COLUMN;

/// Domain type of a table column.
///
/// # Examples
///
/// ```
/// use tablesync_core::{Affinity, ColumnType};
///
/// let ty: ColumnType = "bool".parse().unwrap();
/// assert_eq!(ty, ColumnType::Boolean);
/// assert_eq!(ty.affinity(), Affinity::Integer);
/// assert_eq!("Float".parse::<ColumnType>().unwrap(), ColumnType::Real);
/// assert!("blob".parse::<ColumnType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Structural mapping, stored as JSON text.
    Object,
    /// Structural sequence, stored as JSON text.
    Array,
    /// Text (`string` is an alias).
    #[serde(alias = "string")]
    Text,
    /// 64-bit integer (`int` is an alias).
    #[serde(alias = "int")]
    Integer,
    /// Double-precision float (`float` is an alias).
    #[serde(alias = "float")]
    Real,
    /// Boolean stored as 0/1 (`bool` is an alias).
    #[serde(alias = "bool")]
    Boolean,
    /// Timestamp stored as integer milliseconds since the Unix epoch.
    Date,
}

impl ColumnType {
    /// Every column type, in declaration order.
    pub const ALL: [ColumnType; 7] = [
        ColumnType::Object,
        ColumnType::Array,
        ColumnType::Text,
        ColumnType::Integer,
        ColumnType::Real,
        ColumnType::Boolean,
        ColumnType::Date,
    ];

    /// Returns the storage affinity used for columns of this type.
    pub const fn affinity(self) -> Affinity {
        match self {
            ColumnType::Object | ColumnType::Array | ColumnType::Text => Affinity::Text,
            ColumnType::Integer | ColumnType::Boolean => Affinity::Integer,
            ColumnType::Real => Affinity::Real,
            ColumnType::Date => Affinity::Numeric,
        }
    }

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            ColumnType::Object => "object",
            ColumnType::Array => "array",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
        }
    }
}

impl FromStr for ColumnType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "object" => Ok(ColumnType::Object),
            "array" => Ok(ColumnType::Array),
            "string" | "text" => Ok(ColumnType::Text),
            "integer" | "int" => Ok(ColumnType::Integer),
            "real" | "float" => Ok(ColumnType::Real),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            _ => Err(ValidationError::UnsupportedColumnType(s.to_string())),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage category a column physically uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    Text,
    Integer,
    Real,
    Numeric,
}

impl Affinity {
    /// SQL type name used in `CREATE TABLE` / `ALTER TABLE` statements.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Affinity::Text => "TEXT",
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Numeric => "NUMERIC",
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A named table and its ordered column declarations.
///
/// Every table must declare an [`ID_COLUMN`] column; see
/// [`validate_table_definition`](crate::validate_table_definition).
///
/// # Examples
///
/// ```
/// use tablesync_core::{ColumnType, TableDefinition};
///
/// let table = TableDefinition::new("todo")
///     .with_column("id", ColumnType::Text)
///     .with_column("done", ColumnType::Boolean);
/// assert_eq!(table.column_type("done"), Some(ColumnType::Boolean));
/// assert_eq!(table.column_type("missing"), None);
/// assert!(table.has_id_column());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds or replaces a column declaration.
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.column_type = column_type,
            None => self.columns.push(ColumnDefinition { name, column_type }),
        }
        self
    }

    /// Returns the declared type of `column`, or `None` if it is undeclared.
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.column_type)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_type(column).is_some()
    }

    pub fn has_id_column(&self) -> bool {
        self.has_column(ID_COLUMN)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_parse_to_same_variant() {
        assert_eq!("string".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("text".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("int".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("float".parse::<ColumnType>().unwrap(), ColumnType::Real);
        assert_eq!("BOOL".parse::<ColumnType>().unwrap(), ColumnType::Boolean);
    }

    #[test]
    fn test_unsupported_type_names() {
        assert!(matches!(
            "blob".parse::<ColumnType>(),
            Err(ValidationError::UnsupportedColumnType(_))
        ));
        assert!("".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_affinity_mapping() {
        assert_eq!(ColumnType::Object.affinity(), Affinity::Text);
        assert_eq!(ColumnType::Array.affinity(), Affinity::Text);
        assert_eq!(ColumnType::Text.affinity(), Affinity::Text);
        assert_eq!(ColumnType::Integer.affinity(), Affinity::Integer);
        assert_eq!(ColumnType::Boolean.affinity(), Affinity::Integer);
        assert_eq!(ColumnType::Real.affinity(), Affinity::Real);
        assert_eq!(ColumnType::Date.affinity(), Affinity::Numeric);
    }

    #[test]
    fn test_serde_accepts_aliases() {
        let column: ColumnDefinition = serde_json::from_str(r#"{"name":"n","type":"int"}"#).unwrap();
        assert_eq!(column.column_type, ColumnType::Integer);
        let json = serde_json::to_string(&column).unwrap();
        assert_eq!(json, r#"{"name":"n","type":"integer"}"#);
    }

    #[test]
    fn test_with_column_replaces_type() {
        let table = TableDefinition::new("t")
            .with_column("id", ColumnType::Integer)
            .with_column("flag", ColumnType::Integer)
            .with_column("flag", ColumnType::Boolean);
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.column_type("flag"), Some(ColumnType::Boolean));
    }
}
