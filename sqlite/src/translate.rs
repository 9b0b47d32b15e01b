//! Translation of structured queries into parameterized SQL.
//!
//! A [`Query`] becomes one `SELECT` for the data and, when the total count
//! is requested, a second `SELECT COUNT(*)` sharing the same `WHERE`
//! clause. Every literal in a filter is bound as a parameter; table and
//! column names are validated and bracket-quoted.
//!
//! | Filter                 | SQL                                              |
//! |------------------------|--------------------------------------------------|
//! | `a = null`, `a != null`| `[a] IS NULL`, `[a] IS NOT NULL`                 |
//! | `a IN []`              | `0`                                              |
//! | `starts_with(a, s)`    | `instr([a], ?) = 1`                              |
//! | `ends_with(a, s)`      | `length([a]) >= length(?) AND substr(...) = ?`   |
//! | `contains(a, s)`       | `instr([a], ?) > 0`                              |
//!
//! The string functions compare bytes, so they are case-sensitive.

use rusqlite::types::Value as SqlValue;
use tablesync_core::{
    CompareOp, Direction, Expr, Query, StringFunction, Value, validate_column_name,
    validate_table_name,
};

use crate::convert::to_parameter;
use crate::database::{Statement, StatementBatch};
use crate::error::Result;
use crate::schema::quote;

/// Statements produced for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslatedQuery {
    DataOnly(Statement),
    DataAndCount { data: Statement, count: Statement },
}

impl TranslatedQuery {
    /// The statement producing the requested rows.
    pub fn data(&self) -> &Statement {
        match self {
            TranslatedQuery::DataOnly(data) | TranslatedQuery::DataAndCount { data, .. } => data,
        }
    }

    pub fn has_count(&self) -> bool {
        matches!(self, TranslatedQuery::DataAndCount { .. })
    }

    /// Data statement first, then the count statement if present.
    pub fn into_batch(self) -> StatementBatch {
        match self {
            TranslatedQuery::DataOnly(data) => vec![data].into(),
            TranslatedQuery::DataAndCount { data, count } => vec![data, count].into(),
        }
    }
}

/// Translates `query` into SQL.
///
/// # Errors
///
/// Returns [`StoreError::Validation`](crate::StoreError::Validation) if the
/// table name or any referenced column name is not a valid identifier.
pub fn translate(query: &Query) -> Result<TranslatedQuery> {
    validate_table_name(&query.table)?;
    let table = quote(&query.table);

    let mut filter = Filter::default();
    if let Some(predicate) = &query.filter {
        filter.push_expr(predicate)?;
    }
    let where_clause = if filter.sql.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filter.sql)
    };

    let mut projected: Vec<&str> = Vec::with_capacity(query.selections.len());
    for column in &query.selections {
        validate_column_name(column)?;
        if !projected.contains(&column.as_str()) {
            projected.push(column);
        }
    }
    let projection = if projected.is_empty() {
        "*".to_string()
    } else {
        projected
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {projection} FROM {table}{where_clause}");

    if !query.ordering.is_empty() {
        let mut clauses = Vec::with_capacity(query.ordering.len());
        for order in &query.ordering {
            validate_column_name(&order.column)?;
            let direction = match order.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            clauses.push(format!("{} {direction}", quote(&order.column)));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
    }

    match (query.take, query.skip) {
        (Some(take), Some(skip)) => sql.push_str(&format!(" LIMIT {take} OFFSET {skip}")),
        (Some(take), None) => sql.push_str(&format!(" LIMIT {take}")),
        (None, Some(skip)) => sql.push_str(&format!(" LIMIT -1 OFFSET {skip}")),
        (None, None) => {}
    }

    let data = Statement::with_params(sql, filter.params.clone());
    if !query.include_total_count {
        return Ok(TranslatedQuery::DataOnly(data));
    }

    let count = Statement::with_params(
        format!("SELECT COUNT(*) AS [count] FROM {table}{where_clause}"),
        filter.params,
    );
    Ok(TranslatedQuery::DataAndCount { data, count })
}

/// Accumulates the SQL text and parameters of a `WHERE` clause.
#[derive(Debug, Default)]
struct Filter {
    sql: String,
    params: Vec<SqlValue>,
}

impl Filter {
    fn push_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(name) => {
                validate_column_name(name)?;
                self.sql.push_str(&quote(name));
            }
            Expr::Literal(value) => self.push_param(value),
            Expr::Compare { op, left, right } => self.push_compare(*op, left, right)?,
            Expr::And(left, right) => self.push_binary(left, "AND", right)?,
            Expr::Or(left, right) => self.push_binary(left, "OR", right)?,
            Expr::Not(inner) => {
                self.sql.push_str("(NOT ");
                self.push_expr(inner)?;
                self.sql.push(')');
            }
            Expr::IsNull(inner) => {
                self.sql.push('(');
                self.push_expr(inner)?;
                self.sql.push_str(" IS NULL)");
            }
            Expr::In { expr, list } => {
                if list.is_empty() {
                    self.sql.push('0');
                    return Ok(());
                }
                self.sql.push('(');
                self.push_expr(expr)?;
                self.sql.push_str(" IN (");
                for (index, value) in list.iter().enumerate() {
                    if index > 0 {
                        self.sql.push_str(", ");
                    }
                    self.push_param(value);
                }
                self.sql.push_str("))");
            }
            Expr::Function {
                function,
                target,
                argument,
            } => self.push_function(*function, target, argument)?,
        }
        Ok(())
    }

    fn push_param(&mut self, value: &Value) {
        self.sql.push('?');
        self.params.push(to_parameter(value));
    }

    fn push_binary(&mut self, left: &Expr, keyword: &str, right: &Expr) -> Result<()> {
        self.sql.push('(');
        self.push_expr(left)?;
        self.sql.push(' ');
        self.sql.push_str(keyword);
        self.sql.push(' ');
        self.push_expr(right)?;
        self.sql.push(')');
        Ok(())
    }

    fn push_compare(&mut self, op: CompareOp, left: &Expr, right: &Expr) -> Result<()> {
        // Equality against null uses IS so it matches missing values.
        let null_test = match (op, left, right) {
            (CompareOp::Eq, operand, Expr::Literal(Value::Null))
            | (CompareOp::Eq, Expr::Literal(Value::Null), operand) => Some((operand, "IS NULL")),
            (CompareOp::Ne, operand, Expr::Literal(Value::Null))
            | (CompareOp::Ne, Expr::Literal(Value::Null), operand) => {
                Some((operand, "IS NOT NULL"))
            }
            _ => None,
        };
        if let Some((operand, test)) = null_test {
            self.sql.push('(');
            self.push_expr(operand)?;
            self.sql.push(' ');
            self.sql.push_str(test);
            self.sql.push(')');
            return Ok(());
        }

        let operator = match op {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        self.push_binary(left, operator, right)
    }

    fn push_function(
        &mut self,
        function: StringFunction,
        target: &Expr,
        argument: &Expr,
    ) -> Result<()> {
        match function {
            StringFunction::StartsWith | StringFunction::Contains => {
                self.sql.push_str("(instr(");
                self.push_expr(target)?;
                self.sql.push_str(", ");
                self.push_expr(argument)?;
                self.sql.push_str(if function == StringFunction::StartsWith {
                    ") = 1)"
                } else {
                    ") > 0)"
                });
            }
            StringFunction::EndsWith => {
                self.sql.push_str("(length(");
                self.push_expr(target)?;
                self.sql.push_str(") >= length(");
                self.push_expr(argument)?;
                self.sql.push_str(") AND substr(");
                self.push_expr(target)?;
                self.sql.push_str(", length(");
                self.push_expr(target)?;
                self.sql.push_str(") - length(");
                self.push_expr(argument)?;
                self.sql.push_str(") + 1) = ");
                self.push_expr(argument)?;
                self.sql.push(')');
            }
        }
        Ok(())
    }
}
