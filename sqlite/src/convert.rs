//! Bidirectional conversion between domain values and SQLite storage values.
//!
//! The scalar layer ([`serialize_scalar`] / [`deserialize_scalar`]) converts a
//! single [`Value`] according to a column's [`ColumnType`]; the row layer
//! ([`serialize_row`] / [`deserialize_row`]) applies it to every property of a
//! record using the table's declared column types.
//!
//! # Storage forms
//!
//! | Column type         | Stored as                                  |
//! |---------------------|--------------------------------------------|
//! | `Object`, `Array`   | JSON text                                  |
//! | `Text`              | text; other kinds are stringified          |
//! | `Integer`           | integer; booleans become 0/1               |
//! | `Boolean`           | 0/1                                        |
//! | `Real`              | real                                       |
//! | `Date`              | integer milliseconds since the Unix epoch  |
//!
//! Serialization is strict: a value of the wrong kind, or a row property with
//! no declared column, is an error. Deserialization is tolerant of columns that
//! are no longer declared: their stored values come back unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Value as SqlValue;
use tablesync_core::{ColumnType, Row, TableDefinition, Value, format_date};

use crate::error::{Result, StoreError};

/// A row as stored: column names paired with storage values, in column order.
pub type StoredRow = Vec<(String, SqlValue)>;

/// Converts a domain value to its storage form for a column of `column_type`.
///
/// Null short-circuits to SQL `NULL` for every column type.
///
/// # Errors
///
/// Returns [`StoreError::UnsupportedConversion`] if the value's kind cannot be
/// stored in a column of `column_type` (e.g. a real in an `Integer` column,
/// or a NaN or infinite real in a `Real` column).
pub fn serialize_scalar(value: &Value, column_type: ColumnType) -> Result<SqlValue> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    let stored = match column_type {
        ColumnType::Object => {
            matches!(value, Value::Object(_)).then(|| SqlValue::Text(value.to_json().to_string()))
        }
        ColumnType::Array => {
            matches!(value, Value::Array(_)).then(|| SqlValue::Text(value.to_json().to_string()))
        }
        ColumnType::Text => Some(SqlValue::Text(stringify(value))),
        ColumnType::Integer => match value {
            Value::Integer(i) => Some(SqlValue::Integer(*i)),
            Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
            _ => None,
        },
        ColumnType::Boolean => value.as_bool().map(|b| SqlValue::Integer(i64::from(b))),
        ColumnType::Date => value
            .as_date()
            .map(|d| SqlValue::Integer(d.timestamp_millis())),
        ColumnType::Real => value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(SqlValue::Real),
    };

    stored.ok_or_else(|| StoreError::UnsupportedConversion {
        value: value.to_string(),
        kind: value.kind(),
        target: column_type.name(),
    })
}

/// Converts a value read from storage back to its domain form.
///
/// `column_type` is `None` when the column exists in storage but is not
/// declared in the current table definition; the value is then passed through
/// unchanged. Values that are already in domain form (e.g. an `Object` for an
/// `Object` column) also pass through, so already-deserialized rows can be
/// deserialized again.
///
/// # Errors
///
/// Returns [`StoreError::Deserialization`] if the stored value cannot be
/// interpreted as `column_type` (malformed JSON, JSON of the wrong shape,
/// unparsable date text, non-numeric real, ...).
pub fn deserialize_scalar(value: Value, column_type: Option<ColumnType>) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(column_type) = column_type else {
        return Ok(value);
    };

    let converted = match column_type {
        ColumnType::Object => match &value {
            Value::Object(_) => Some(value.clone()),
            Value::Text(s) => match serde_json::from_str(s) {
                Ok(serde_json::Value::Object(map)) => Some(Value::Object(map)),
                _ => None,
            },
            _ => None,
        },
        ColumnType::Array => match &value {
            Value::Array(_) => Some(value.clone()),
            Value::Text(s) => match serde_json::from_str(s) {
                Ok(serde_json::Value::Array(items)) => Some(Value::Array(items)),
                _ => None,
            },
            _ => None,
        },
        ColumnType::Text => Some(match &value {
            Value::Text(_) => value.clone(),
            other => Value::Text(stringify(other)),
        }),
        ColumnType::Integer => match &value {
            Value::Integer(_) => Some(value.clone()),
            Value::Bool(b) => Some(Value::Integer(i64::from(*b))),
            Value::Real(f) => whole_number(*f).map(Value::Integer),
            _ => None,
        },
        ColumnType::Boolean => match &value {
            Value::Bool(_) => Some(value.clone()),
            Value::Integer(i) => Some(Value::Bool(*i != 0)),
            _ => None,
        },
        ColumnType::Date => match &value {
            Value::Date(_) => Some(value.clone()),
            Value::Integer(ms) => DateTime::<Utc>::from_timestamp_millis(*ms).map(Value::Date),
            Value::Real(f) => whole_number(*f)
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(Value::Date),
            Value::Text(s) => parse_date_text(s).map(Value::Date),
            _ => None,
        },
        ColumnType::Real => value.as_f64().map(Value::Real),
    };

    converted.ok_or_else(|| StoreError::Deserialization {
        value: value.to_string(),
        kind: value.kind(),
        target: column_type.name(),
    })
}

/// Converts a value to a statement parameter based on its kind alone.
///
/// Used for ids, predicate literals and columns with no declared type.
pub fn to_parameter(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Date(d) => SqlValue::Integer(d.timestamp_millis()),
        Value::Object(_) | Value::Array(_) => SqlValue::Text(value.to_json().to_string()),
    }
}

/// Maps a raw storage value to a domain value without any type information.
pub fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Integer(i),
        SqlValue::Real(f) => Value::Real(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Serializes every property of `row` using the table's declared column types.
///
/// Property order is preserved.
///
/// # Errors
///
/// Returns [`StoreError::Schema`] if a property has no declared column, or
/// [`StoreError::UnsupportedConversion`] if a value does not fit its column.
pub fn serialize_row(row: &Row, table: &TableDefinition) -> Result<StoredRow> {
    row.iter()
        .map(|(column, value)| {
            let column_type = table.column_type(column).ok_or_else(|| {
                StoreError::Schema(format!(
                    "column '{column}' is not defined in table '{}'",
                    table.name
                ))
            })?;
            Ok((column.to_string(), serialize_scalar(value, column_type)?))
        })
        .collect()
}

/// Reconstructs a domain row from stored values.
///
/// Columns missing from the table definition are passed through unchanged.
///
/// # Errors
///
/// Returns [`StoreError::Deserialization`] if a declared column's value cannot
/// be converted.
pub fn deserialize_row(stored: StoredRow, table: &TableDefinition) -> Result<Row> {
    let mut row = Row::new();
    for (column, raw) in stored {
        let value = deserialize_scalar(from_sql(raw), table.column_type(&column))?;
        row.insert(column, value);
    }
    Ok(row)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Date(d) => format_date(d),
        Value::Null | Value::Object(_) | Value::Array(_) => value.to_json().to_string(),
    }
}

fn whole_number(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tablesync_core::row;

    fn roundtrip(value: Value, column_type: ColumnType) -> Value {
        let stored = serialize_scalar(&value, column_type).unwrap();
        deserialize_scalar(from_sql(stored), Some(column_type)).unwrap()
    }

    fn sample_table() -> TableDefinition {
        TableDefinition::new("t")
            .with_column("id", ColumnType::Text)
            .with_column("object", ColumnType::Object)
            .with_column("array", ColumnType::Array)
            .with_column("integer", ColumnType::Integer)
            .with_column("real", ColumnType::Real)
            .with_column("text", ColumnType::Text)
            .with_column("boolean", ColumnType::Boolean)
            .with_column("date", ColumnType::Date)
    }

    #[test]
    fn test_roundtrip_every_type() {
        let date = Utc.with_ymd_and_hms(2015, 12, 11, 23, 5, 59).unwrap();
        let cases = [
            (Value::from(json!({"int": 1, "string": "str1"})), ColumnType::Object),
            (Value::from(json!([2, "str2", {"int": 3, "array": [4, 5, 6]}])), ColumnType::Array),
            (Value::from("str3"), ColumnType::Text),
            (Value::from(7), ColumnType::Integer),
            (Value::from(9.5), ColumnType::Real),
            (Value::from(true), ColumnType::Boolean),
            (Value::from(false), ColumnType::Boolean),
            (Value::from(date), ColumnType::Date),
        ];
        for (value, column_type) in cases {
            assert_eq!(roundtrip(value.clone(), column_type), value, "{column_type}");
        }
    }

    #[test]
    fn test_roundtrip_null_for_every_type() {
        for column_type in ColumnType::ALL {
            assert_eq!(serialize_scalar(&Value::Null, column_type).unwrap(), SqlValue::Null);
            assert_eq!(roundtrip(Value::Null, column_type), Value::Null);
        }
    }

    #[test]
    fn test_date_stored_as_epoch_millis() {
        let date = Utc.timestamp_millis_opt(1_449_875_159_123).unwrap();
        assert_eq!(
            serialize_scalar(&Value::from(date), ColumnType::Date).unwrap(),
            SqlValue::Integer(1_449_875_159_123)
        );
    }

    #[test]
    fn test_boolean_serializes_to_zero_one() {
        assert_eq!(
            serialize_scalar(&Value::from(true), ColumnType::Boolean).unwrap(),
            SqlValue::Integer(1)
        );
        assert_eq!(
            serialize_scalar(&Value::from(false), ColumnType::Integer).unwrap(),
            SqlValue::Integer(0)
        );
    }

    #[test]
    fn test_text_column_stringifies_other_kinds() {
        assert_eq!(
            serialize_scalar(&Value::from(5), ColumnType::Text).unwrap(),
            SqlValue::Text("5".into())
        );
        assert_eq!(
            serialize_scalar(&Value::from(1.5), ColumnType::Text).unwrap(),
            SqlValue::Text("1.5".into())
        );
        assert_eq!(
            serialize_scalar(&Value::from(json!({"a": 1})), ColumnType::Text).unwrap(),
            SqlValue::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn test_integer_rejects_other_kinds() {
        for value in [Value::from(1.5), Value::from("1"), Value::from(json!({"a": 1}))] {
            match serialize_scalar(&value, ColumnType::Integer) {
                Err(StoreError::UnsupportedConversion { target, .. }) => {
                    assert_eq!(target, "integer")
                }
                other => panic!("expected UnsupportedConversion, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_strict_kinds_for_structured_date_boolean_and_real() {
        assert!(serialize_scalar(&Value::from(json!([1])), ColumnType::Object).is_err());
        assert!(serialize_scalar(&Value::from(json!({"a": 1})), ColumnType::Array).is_err());
        assert!(serialize_scalar(&Value::from("2015-01-01"), ColumnType::Date).is_err());
        assert!(serialize_scalar(&Value::from(1), ColumnType::Boolean).is_err());
        match serialize_scalar(&Value::from("x"), ColumnType::Real) {
            Err(StoreError::UnsupportedConversion { target, .. }) => assert_eq!(target, "real"),
            other => panic!("expected UnsupportedConversion, got {other:?}"),
        }
    }

    #[test]
    fn test_real_accepts_integers() {
        assert_eq!(
            serialize_scalar(&Value::from(200), ColumnType::Real).unwrap(),
            SqlValue::Real(200.0)
        );
        assert_eq!(
            deserialize_scalar(Value::Integer(200), Some(ColumnType::Real)).unwrap(),
            Value::Real(200.0)
        );
    }

    #[test]
    fn test_real_rejects_non_finite_values() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                serialize_scalar(&Value::Real(value), ColumnType::Real),
                Err(StoreError::UnsupportedConversion { kind: "real", .. })
            ));
        }
    }

    #[test]
    fn test_malformed_json_fails_deserialization() {
        match deserialize_scalar(Value::from("{not json"), Some(ColumnType::Object)) {
            Err(StoreError::Deserialization { value, kind, target }) => {
                assert_eq!(value, r#""{not json""#);
                assert_eq!(kind, "text");
                assert_eq!(target, "object");
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }

    #[test]
    fn test_json_of_wrong_shape_fails_deserialization() {
        assert!(matches!(
            deserialize_scalar(Value::from("[1,2]"), Some(ColumnType::Object)),
            Err(StoreError::Deserialization { .. })
        ));
        assert!(matches!(
            deserialize_scalar(Value::from(r#"{"a":1}"#), Some(ColumnType::Array)),
            Err(StoreError::Deserialization { .. })
        ));
    }

    #[test]
    fn test_structural_values_pass_through_deserialization() {
        let object = Value::from(json!({"a": 1}));
        assert_eq!(
            deserialize_scalar(object.clone(), Some(ColumnType::Object)).unwrap(),
            object
        );
        let array = Value::from(json!([1]));
        assert_eq!(deserialize_scalar(array.clone(), Some(ColumnType::Array)).unwrap(), array);
    }

    #[test]
    fn test_integer_storage_is_not_converted_to_boolean() {
        assert_eq!(
            deserialize_scalar(Value::Integer(1), Some(ColumnType::Integer)).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            deserialize_scalar(Value::Integer(51), Some(ColumnType::Boolean)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            deserialize_scalar(Value::Integer(0), Some(ColumnType::Boolean)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_date_from_text() {
        let expected = Utc.with_ymd_and_hms(2015, 12, 11, 23, 5, 59).unwrap();
        for text in ["2015-12-11T23:05:59.000Z", "2015-12-11T23:05:59", "2015-12-11T23:05:59+00:00"] {
            assert_eq!(
                deserialize_scalar(Value::from(text), Some(ColumnType::Date)).unwrap(),
                Value::Date(expected),
                "{text}"
            );
        }
        assert_eq!(
            deserialize_scalar(Value::from("2015-12-11"), Some(ColumnType::Date)).unwrap(),
            Value::Date(Utc.with_ymd_and_hms(2015, 12, 11, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparsable_date_text_fails() {
        assert!(matches!(
            deserialize_scalar(Value::from("1"), Some(ColumnType::Date)),
            Err(StoreError::Deserialization { target: "date", .. })
        ));
    }

    #[test]
    fn test_undeclared_column_passes_through() {
        assert_eq!(
            deserialize_scalar(Value::Integer(51), None).unwrap(),
            Value::Integer(51)
        );
        assert_eq!(
            deserialize_scalar(Value::from("x"), None).unwrap(),
            Value::from("x")
        );
    }

    #[test]
    fn test_real_deserialization_rejects_text() {
        assert!(matches!(
            deserialize_scalar(Value::from("abc"), Some(ColumnType::Real)),
            Err(StoreError::Deserialization { target: "real", .. })
        ));
    }

    #[test]
    fn test_serialize_row_preserves_order() {
        let row = row! { "text" => "a", "id" => "x", "integer" => 3 };
        let stored = serialize_row(&row, &sample_table()).unwrap();
        assert_eq!(
            stored,
            vec![
                ("text".to_string(), SqlValue::Text("a".into())),
                ("id".to_string(), SqlValue::Text("x".into())),
                ("integer".to_string(), SqlValue::Integer(3)),
            ]
        );
    }

    #[test]
    fn test_serialize_row_rejects_undeclared_property() {
        let row = row! { "id" => "x", "undeclared" => 1 };
        assert!(matches!(
            serialize_row(&row, &sample_table()),
            Err(StoreError::Schema(_))
        ));
    }

    #[test]
    fn test_deserialize_row_tolerates_undeclared_columns() {
        let stored = vec![
            ("id".to_string(), SqlValue::Text("x".into())),
            ("boolean".to_string(), SqlValue::Integer(1)),
            ("extra".to_string(), SqlValue::Integer(2)),
        ];
        let row = deserialize_row(stored, &sample_table()).unwrap();
        assert_eq!(row, row! { "id" => "x", "boolean" => true, "extra" => 2 });
    }

    #[test]
    fn test_to_parameter_by_kind() {
        assert_eq!(to_parameter(&Value::from(true)), SqlValue::Integer(1));
        assert_eq!(to_parameter(&Value::Null), SqlValue::Null);
        assert_eq!(to_parameter(&Value::from("a")), SqlValue::Text("a".into()));
        let date = Utc.timestamp_millis_opt(1_000).unwrap();
        assert_eq!(to_parameter(&Value::from(date)), SqlValue::Integer(1_000));
    }
}
