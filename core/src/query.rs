//! Structured query input.
//!
//! A [`Query`] names a table and optionally carries a filter predicate
//! ([`Expr`]), a column projection, ordering, paging and a request for the
//! total count of matching rows. Queries are plain data; translating them to
//! SQL is the storage backend's job.
//!
//! # Examples
//!
//! ```
//! use tablesync_core::{Query, col};
//!
//! let query = Query::new("todo")
//!     .filter(col("done").eq(false).and(col("priority").ge(2)))
//!     .select(["id", "text", "id"])
//!     .order_by_descending("priority")
//!     .skip(10)
//!     .take(5)
//!     .include_total_count();
//!
//! assert_eq!(query.selections, ["id", "text"]);
//! assert!(query.include_total_count);
//! ```

use chrono::{DateTime, Utc};

use crate::value::{Row, Value};

/// Sort direction of an ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A single ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Case-sensitive string predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFunction {
    StartsWith,
    EndsWith,
    Contains,
}

/// Boolean-valued expression over row fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a column.
    Column(String),
    /// Bound value; always becomes a statement parameter.
    Literal(Value),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    In {
        expr: Box<Expr>,
        list: Vec<Value>,
    },
    Function {
        function: StringFunction,
        target: Box<Expr>,
        argument: Box<Expr>,
    },
}

/// Shorthand for [`Expr::Column`].
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Shorthand for [`Expr::Literal`].
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    fn compare(self, op: CompareOp, rhs: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(rhs.into()),
        }
    }

    pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Le, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ge, rhs)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::In {
            expr: Box::new(self),
            list: values.into_iter().map(Into::into).collect(),
        }
    }

    fn function(self, function: StringFunction, argument: impl Into<Expr>) -> Expr {
        Expr::Function {
            function,
            target: Box::new(self),
            argument: Box::new(argument.into()),
        }
    }

    pub fn starts_with(self, prefix: impl Into<Expr>) -> Expr {
        self.function(StringFunction::StartsWith, prefix)
    }

    pub fn ends_with(self, suffix: impl Into<Expr>) -> Expr {
        self.function(StringFunction::EndsWith, suffix)
    }

    pub fn contains(self, needle: impl Into<Expr>) -> Expr {
        self.function(StringFunction::Contains, needle)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(bool, i32, i64, u32, f64, &str, String, DateTime<Utc>);

/// A structured read request against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filter: Option<Expr>,
    /// Projected columns, deduplicated in order of first occurrence.
    /// Empty means every column.
    pub selections: Vec<String>,
    pub ordering: Vec<OrderBy>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub include_total_count: bool,
}

impl Query {
    /// Creates a query that reads every row of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            selections: Vec::new(),
            ordering: Vec::new(),
            skip: None,
            take: None,
            include_total_count: false,
        }
    }

    /// Adds a predicate. Repeated calls are combined with `AND`.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Adds columns to the projection, skipping ones already selected.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.selections.contains(&column) {
                self.selections.push(column);
            }
        }
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.ordering.push(OrderBy {
            column: column.into(),
            direction: Direction::Ascending,
        });
        self
    }

    pub fn order_by_descending(mut self, column: impl Into<String>) -> Self {
        self.ordering.push(OrderBy {
            column: column.into(),
            direction: Direction::Descending,
        });
        self
    }

    pub fn skip(mut self, count: u64) -> Self {
        self.skip = Some(count);
        self
    }

    pub fn take(mut self, count: u64) -> Self {
        self.take = Some(count);
        self
    }

    pub fn include_total_count(mut self) -> Self {
        self.include_total_count = true;
        self
    }

    /// Returns a copy of this query with the projection removed.
    pub fn without_selections(&self) -> Self {
        Self {
            selections: Vec::new(),
            ..self.clone()
        }
    }
}

/// Result of reading a query.
///
/// Queries that asked for the total count produce [`ReadResult::WithCount`];
/// all others produce [`ReadResult::Rows`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResult {
    Rows(Vec<Row>),
    WithCount { result: Vec<Row>, count: u64 },
}

impl ReadResult {
    pub fn rows(&self) -> &[Row] {
        match self {
            ReadResult::Rows(rows) => rows,
            ReadResult::WithCount { result, .. } => result,
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            ReadResult::Rows(rows) => rows,
            ReadResult::WithCount { result, .. } => result,
        }
    }

    /// Total number of matching rows, if the query asked for it.
    pub fn count(&self) -> Option<u64> {
        match self {
            ReadResult::Rows(_) => None,
            ReadResult::WithCount { count, .. } => Some(*count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_dedups_in_first_occurrence_order() {
        let query = Query::new("t").select(["id", "id", "str", "str"]).select(["id", "n"]);
        assert_eq!(query.selections, ["id", "str", "n"]);
    }

    #[test]
    fn test_repeated_filters_are_anded() {
        let query = Query::new("t").filter(col("a").eq(1)).filter(col("b").eq(2));
        assert_eq!(query.filter, Some(col("a").eq(1).and(col("b").eq(2))));
    }

    #[test]
    fn test_without_selections_keeps_everything_else() {
        let query = Query::new("t")
            .filter(col("a").lt(3))
            .select(["a"])
            .order_by("a")
            .skip(2)
            .take(1);
        let stripped = query.without_selections();
        assert!(stripped.selections.is_empty());
        assert_eq!(stripped.filter, query.filter);
        assert_eq!(stripped.ordering, query.ordering);
        assert_eq!(stripped.skip, Some(2));
        assert_eq!(stripped.take, Some(1));
    }

    #[test]
    fn test_not_operator() {
        let expr = !col("done").eq(true);
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn test_read_result_accessors() {
        let rows = ReadResult::Rows(vec![Row::new()]);
        assert_eq!(rows.count(), None);
        assert_eq!(rows.rows().len(), 1);

        let counted = ReadResult::WithCount {
            result: Vec::new(),
            count: 7,
        };
        assert_eq!(counted.count(), Some(7));
        assert!(counted.into_rows().is_empty());
    }
}
