//! Statement execution.
//!
//! [`Database`] is the contract the store needs from its storage engine:
//! run one statement on its own, or run an ordered [`StatementBatch`] as a
//! single all-or-nothing transaction. [`SqliteDatabase`] implements it on top
//! of a [`rusqlite::Connection`].

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, trace};

use crate::convert::StoredRow;
use crate::error::Result;

/// A SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// An ordered group of statements executed with all-or-nothing semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementBatch {
    statements: Vec<Statement>,
}

impl StatementBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

impl From<Vec<Statement>> for StatementBatch {
    fn from(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl FromIterator<Statement> for StatementBatch {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StatementBatch {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

/// Rows produced by one statement.
///
/// Statements that return no rows (DDL, inserts, updates, deletes) produce an
/// empty result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns row `index` paired with its column names.
    pub fn row(&self, index: usize) -> Option<StoredRow> {
        self.rows.get(index).map(|values| {
            self.columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect()
        })
    }

    /// Returns the first column of the first row.
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|values| values.first())
    }

    /// Consumes the result set, yielding each row paired with its column names.
    pub fn into_rows(self) -> impl Iterator<Item = StoredRow> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(move |values| columns.iter().cloned().zip(values).collect())
    }
}

/// Storage engine contract used by the store.
pub trait Database: Send {
    /// Executes a single statement outside an explicit transaction.
    fn execute_sql(&mut self, statement: &Statement) -> Result<ResultSet>;

    /// Executes every statement of `batch` in order inside one transaction,
    /// returning one result set per statement.
    ///
    /// If any statement fails, the transaction is rolled back and the error
    /// of the failing statement is returned; none of the batch's effects
    /// persist.
    fn execute_batch(&mut self, batch: &StatementBatch) -> Result<Vec<ResultSet>>;
}

/// [`Database`] backed by a SQLite connection.
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl Database for SqliteDatabase {
    fn execute_sql(&mut self, statement: &Statement) -> Result<ResultSet> {
        run(&self.conn, statement)
    }

    fn execute_batch(&mut self, batch: &StatementBatch) -> Result<Vec<ResultSet>> {
        debug!(statements = batch.len(), "Executing statement batch");
        let tx = self.conn.transaction()?;
        let mut results = Vec::with_capacity(batch.len());
        for statement in batch {
            results.push(run(&tx, statement)?);
        }
        tx.commit()?;
        Ok(results)
    }
}

/// Runs one statement, collecting any rows it produces.
fn run(conn: &Connection, statement: &Statement) -> Result<ResultSet> {
    trace!(sql = %statement.sql, params = statement.params.len(), "Executing statement");
    let mut stmt = conn.prepare(&statement.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            row_values.push(row.get::<_, SqlValue>(index)?);
        }
        values.push(row_values);
    }

    Ok(ResultSet::new(columns, values))
}
