//! Store configuration.
//!
//! Declares where the local database lives and which tables to define when
//! the store is opened. Loaded from YAML.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! database: todo.db
//! tables:
//!   - name: todo
//!     columns:
//!       - { name: id, type: string }
//!       - { name: text, type: text }
//!       - { name: done, type: bool }
//!       - { name: due, type: date }
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::types::TableDefinition;
use crate::validate::validate_table_definition;

/// Database path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Top-level store configuration.
///
/// # Examples
///
/// ```
/// use tablesync_core::{ColumnType, StoreConfig};
///
/// let yaml = r#"
/// version: "1.0"
/// database: ":memory:"
/// tables:
///   - name: todo
///     columns:
///       - { name: id, type: string }
///       - { name: done, type: bool }
/// "#;
/// let config = StoreConfig::from_yaml_str(yaml).unwrap();
/// assert!(config.is_in_memory());
/// assert_eq!(config.table("todo").unwrap().column_type("done"), Some(ColumnType::Boolean));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Path of the database file, or [`IN_MEMORY`].
    pub database: String,
    /// Tables to define when the store is opened, in order.
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

impl StoreConfig {
    /// Creates a configuration for the given database path with no tables.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            database: database.into(),
            tables: Vec::new(),
        }
    }

    /// Creates an in-memory configuration with no tables.
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    /// Adds a table definition.
    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::YamlError`] if parsing fails, or
    /// [`ConfigError::InvalidTable`] if a table definition is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read,
    /// [`ConfigError::YamlError`] if parsing fails, or
    /// [`ConfigError::InvalidTable`] if a table definition is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be written, or
    /// [`ConfigError::YamlError`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks every table definition, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            if let Some(error) = validate_table_definition(table).into_iter().next() {
                return Err(ConfigError::InvalidTable {
                    table: table.name.clone(),
                    error,
                });
            }
        }
        Ok(())
    }

    /// Returns `true` if the database is in memory.
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    /// Looks up a configured table by name.
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;
    use crate::validate::ValidationError;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
database: todo.db
tables:
  - name: todo
    columns:
      - { name: id, type: string }
      - { name: text, type: text }
      - { name: done, type: bool }
      - { name: due, type: date }
      - { name: tags, type: array }
  - name: settings
    columns:
      - { name: id, type: int }
      - { name: payload, type: object }
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config = StoreConfig::from_yaml_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.database, "todo.db");
        assert!(!config.is_in_memory());
        assert_eq!(config.tables.len(), 2);

        let todo = config.table("todo").unwrap();
        assert_eq!(
            todo.column_names().collect::<Vec<_>>(),
            ["id", "text", "done", "due", "tags"]
        );
        assert_eq!(todo.column_type("id"), Some(ColumnType::Text));
        assert_eq!(todo.column_type("done"), Some(ColumnType::Boolean));
        assert_eq!(
            config.table("settings").unwrap().column_type("id"),
            Some(ColumnType::Integer)
        );
    }

    #[test]
    fn test_tables_default_to_empty() {
        let config = StoreConfig::from_yaml_str("version: \"1.0\"\ndatabase: \":memory:\"\n").unwrap();
        assert!(config.tables.is_empty());
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_unknown_column_type_is_rejected() {
        let yaml = r#"
version: "1.0"
database: x.db
tables:
  - name: t
    columns:
      - { name: id, type: blob }
"#;
        assert!(matches!(
            StoreConfig::from_yaml_str(yaml),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_missing_id_column_is_rejected() {
        let yaml = r#"
version: "1.0"
database: x.db
tables:
  - name: t
    columns:
      - { name: text, type: text }
"#;
        match StoreConfig::from_yaml_str(yaml) {
            Err(ConfigError::InvalidTable { table, error }) => {
                assert_eq!(table, "t");
                assert_eq!(error, ValidationError::MissingIdColumn("t".into()));
            }
            other => panic!("expected InvalidTable, got {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.yml");

        let config = StoreConfig::new("local.db").with_table(
            TableDefinition::new("todo")
                .with_column("id", ColumnType::Text)
                .with_column("done", ColumnType::Boolean),
        );
        config.save(&path).unwrap();

        let loaded = StoreConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            StoreConfig::load("/nonexistent/store.yml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
