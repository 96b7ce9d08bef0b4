//! Transformation operators
//!
//! Each operator takes a [`Table`] (plus parameters) and returns a new
//! [`Table`]; inputs are never mutated. A missing required column is an
//! [`Error::Schema`]; a value that cannot convert is an [`Error::Coercion`].

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::table::{Column, ColumnType, Table, Value};

/// Convert a single value to the target type.
///
/// `Null` passes through unchanged. Text is trimmed before parsing.
/// Float → int only succeeds for integral values.
pub fn convert_value(value: &Value, target: ColumnType, column: &str) -> Result<Value> {
    let coercion = |message: String| Error::Coercion {
        column: column.to_string(),
        message,
    };

    match (value, target) {
        (Value::Null, _) => Ok(Value::Null),

        (Value::Int(v), ColumnType::Int) => Ok(Value::Int(*v)),
        (Value::Float(v), ColumnType::Int) => {
            if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                Ok(Value::Int(*v as i64))
            } else {
                Err(coercion(format!("float {v} is not an integer")))
            }
        }
        (Value::Text(s), ColumnType::Int) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| coercion(format!("'{s}' is not an integer"))),
        (Value::Timestamp(_), ColumnType::Int) => {
            Err(coercion("timestamp cannot become an integer".to_string()))
        }

        (Value::Int(v), ColumnType::Float) => Ok(Value::Float(*v as f64)),
        (Value::Float(v), ColumnType::Float) => Ok(Value::Float(*v)),
        (Value::Text(s), ColumnType::Float) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| coercion(format!("'{s}' is not a number"))),
        (Value::Timestamp(_), ColumnType::Float) => {
            Err(coercion("timestamp cannot become a float".to_string()))
        }

        (Value::Int(v), ColumnType::Text) => Ok(Value::Text(v.to_string())),
        (Value::Float(v), ColumnType::Text) => Ok(Value::Text(v.to_string())),
        (Value::Text(s), ColumnType::Text) => Ok(Value::Text(s.clone())),
        (Value::Timestamp(v), ColumnType::Text) => {
            Ok(Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string()))
        }

        (Value::Timestamp(v), ColumnType::Timestamp) => Ok(Value::Timestamp(*v)),
        (Value::Text(s), ColumnType::Timestamp) => parse_timestamp(s.trim())
            .map(Value::Timestamp)
            .ok_or_else(|| coercion(format!("'{s}' is not a timestamp"))),
        (Value::Int(_) | Value::Float(_), ColumnType::Timestamp) => {
            Err(coercion("number cannot become a timestamp".to_string()))
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    // Bare dates land at midnight
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Convert every value of one column to the target type.
pub fn cast_column(table: &Table, name: &str, target: ColumnType) -> Result<Table> {
    let index = table.require_column(name)?;

    let mut columns = table.columns().to_vec();
    columns[index].ty = target;

    let mut rows = Vec::with_capacity(table.len());
    for row in table.rows() {
        let mut row = row.clone();
        row[index] = convert_value(&row[index], target, name)?;
        rows.push(row);
    }
    Table::new(columns, rows)
}

/// Rename a column, preserving column order.
pub fn rename_column(table: &Table, old: &str, new: &str) -> Result<Table> {
    let index = table.require_column(old)?;
    if table.column_index(new).is_some() {
        return Err(Error::Schema {
            message: format!("column '{new}' already exists"),
        });
    }

    let mut columns = table.columns().to_vec();
    columns[index].name = new.to_string();
    Table::new(columns, table.rows().to_vec())
}

/// Remove a column.
pub fn drop_column(table: &Table, name: &str) -> Result<Table> {
    let index = table.require_column(name)?;

    let mut columns = table.columns().to_vec();
    columns.remove(index);

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.remove(index);
            row
        })
        .collect();
    Table::new(columns, rows)
}

/// Relational inner join of two tables on one key column per side.
///
/// Only rows whose key values match on both sides survive; duplicate key
/// values multiply rows by the cross-product rule. Output preserves left
/// row order; columns are the left columns followed by the right columns
/// minus the right key. NULL keys never match.
pub fn inner_join(
    left: &Table,
    right: &Table,
    left_key: &str,
    right_key: &str,
) -> Result<Table> {
    let lk = left.require_column(left_key)?;
    let rk = right.require_column(right_key)?;

    let mut columns = left.columns().to_vec();
    for (i, col) in right.columns().iter().enumerate() {
        if i == rk {
            continue;
        }
        if left.column_index(&col.name).is_some() {
            return Err(Error::Schema {
                message: format!("join would duplicate column '{}'", col.name),
            });
        }
        columns.push(col.clone());
    }

    // Hash the right side by key, then probe in left row order.
    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if row[rk].is_null() {
            continue;
        }
        by_key.entry(row[rk].canonical()).or_default().push(i);
    }

    let mut rows = Vec::new();
    for left_row in left.rows() {
        if left_row[lk].is_null() {
            continue;
        }
        let Some(matches) = by_key.get(&left_row[lk].canonical()) else {
            continue;
        };
        for &ri in matches {
            let mut row = left_row.clone();
            let right_row = &right.rows()[ri];
            for (i, value) in right_row.iter().enumerate() {
                if i != rk {
                    row.push(value.clone());
                }
            }
            rows.push(row);
        }
    }
    Table::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn movie_table() -> Table {
        Table::new(
            vec![
                Column::new("movieID", ColumnType::Int),
                Column::new("title", ColumnType::Text),
            ],
            vec![
                vec![Value::Int(1), text("Alpha")],
                vec![Value::Int(2), text("Beta")],
                vec![Value::Int(3), text("Gamma")],
                vec![Value::Int(4), text("Delta")],
                vec![Value::Int(5), text("Epsilon")],
            ],
        )
        .unwrap()
    }

    fn award_table() -> Table {
        Table::new(
            vec![
                Column::new("movieID", ColumnType::Int),
                Column::new("Award", ColumnType::Text),
            ],
            vec![
                vec![Value::Int(1), text("Best Picture")],
                vec![Value::Int(3), text("Best Score")],
                vec![Value::Int(5), text("Best Editing")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cast_text_column_to_int() {
        let table = Table::new(
            vec![Column::new("movieID", ColumnType::Text)],
            vec![vec![text("1")], vec![text(" 2 ")], vec![Value::Null]],
        )
        .unwrap();
        let cast = cast_column(&table, "movieID", ColumnType::Int).unwrap();
        assert_eq!(cast.columns()[0].ty, ColumnType::Int);
        assert_eq!(cast.rows()[0][0], Value::Int(1));
        assert_eq!(cast.rows()[1][0], Value::Int(2));
        assert_eq!(cast.rows()[2][0], Value::Null);
    }

    #[test]
    fn test_cast_missing_column_is_schema_error() {
        let result = cast_column(&movie_table(), "nope", ColumnType::Int);
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_cast_unparsable_value_is_coercion_error() {
        let table = Table::new(
            vec![Column::new("movieID", ColumnType::Text)],
            vec![vec![text("not-a-number")]],
        )
        .unwrap();
        let result = cast_column(&table, "movieID", ColumnType::Int);
        assert!(matches!(result, Err(Error::Coercion { .. })));
    }

    #[rstest]
    #[case(Value::Float(3.0), ColumnType::Int, Value::Int(3))]
    #[case(Value::Int(3), ColumnType::Float, Value::Float(3.0))]
    #[case(text("4.5"), ColumnType::Float, Value::Float(4.5))]
    #[case(text("2024-01-15"), ColumnType::Timestamp,
        Value::Timestamp(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap()))]
    #[case(text("2024-01-15 10:30:00"), ColumnType::Timestamp,
        Value::Timestamp(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 30, 0).unwrap()))]
    fn test_convert_value(
        #[case] input: Value,
        #[case] target: ColumnType,
        #[case] expected: Value,
    ) {
        assert_eq!(convert_value(&input, target, "c").unwrap(), expected);
    }

    #[test]
    fn test_convert_fractional_float_to_int_fails() {
        let result = convert_value(&Value::Float(3.5), ColumnType::Int, "c");
        assert!(matches!(result, Err(Error::Coercion { .. })));
    }

    #[test]
    fn test_rename_column_preserves_order() {
        let renamed = rename_column(&movie_table(), "title", "movieTitle").unwrap();
        assert_eq!(renamed.columns()[0].name, "movieID");
        assert_eq!(renamed.columns()[1].name, "movieTitle");
        assert_eq!(renamed.rows(), movie_table().rows());
    }

    #[test]
    fn test_rename_to_existing_name_fails() {
        let result = rename_column(&movie_table(), "title", "movieID");
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_rename_missing_column_fails() {
        let result = rename_column(&movie_table(), "nope", "other");
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_drop_column() {
        let dropped = drop_column(&movie_table(), "title").unwrap();
        assert_eq!(dropped.columns().len(), 1);
        assert_eq!(dropped.rows()[0], vec![Value::Int(1)]);
    }

    #[test]
    fn test_drop_missing_column_fails() {
        assert!(drop_column(&movie_table(), "nope").is_err());
    }

    #[test]
    fn test_inner_join_keeps_only_matching_rows() {
        // 5 movies, awards for 3 of them -> exactly 3 joined rows
        let joined = inner_join(&movie_table(), &award_table(), "movieID", "movieID").unwrap();
        assert_eq!(joined.len(), 3);
        let names: Vec<&str> = joined.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["movieID", "title", "Award"]);
        assert_eq!(joined.rows()[0][0], Value::Int(1));
        assert_eq!(joined.rows()[1][0], Value::Int(3));
        assert_eq!(joined.rows()[2][0], Value::Int(5));
    }

    #[test]
    fn test_inner_join_duplicate_keys_multiply() {
        let right = Table::new(
            vec![
                Column::new("movieID", ColumnType::Int),
                Column::new("Award", ColumnType::Text),
            ],
            vec![
                vec![Value::Int(1), text("Best Picture")],
                vec![Value::Int(1), text("Best Director")],
            ],
        )
        .unwrap();
        let joined = inner_join(&movie_table(), &right, "movieID", "movieID").unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.rows()[0][2], text("Best Picture"));
        assert_eq!(joined.rows()[1][2], text("Best Director"));
    }

    #[test]
    fn test_inner_join_missing_key_is_schema_error() {
        let result = inner_join(&movie_table(), &award_table(), "nope", "movieID");
        assert!(matches!(result, Err(Error::Schema { .. })));
        let result = inner_join(&movie_table(), &award_table(), "movieID", "nope");
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_inner_join_null_keys_never_match() {
        let left = Table::new(
            vec![Column::new("movieID", ColumnType::Int)],
            vec![vec![Value::Null], vec![Value::Int(1)]],
        )
        .unwrap();
        let right = Table::new(
            vec![
                Column::new("movieID", ColumnType::Int),
                Column::new("Award", ColumnType::Text),
            ],
            vec![vec![Value::Null, text("x")], vec![Value::Int(1), text("y")]],
        )
        .unwrap();
        let joined = inner_join(&left, &right, "movieID", "movieID").unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.rows()[0][0], Value::Int(1));
    }

    #[test]
    fn test_inner_join_colliding_column_is_schema_error() {
        let right = Table::new(
            vec![
                Column::new("movieID", ColumnType::Int),
                Column::new("title", ColumnType::Text),
            ],
            vec![],
        )
        .unwrap();
        let result = inner_join(&movie_table(), &right, "movieID", "movieID");
        assert!(matches!(result, Err(Error::Schema { .. })));
    }
}
