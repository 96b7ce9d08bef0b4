//! Tabular result model
//!
//! A [`Table`] is an ordered set of named, typed columns plus an ordered set
//! of rows. Every reader produces one and every transform consumes and
//! returns one.

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (SQL NULL, empty delimited field)
    Null,
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Date-time without timezone
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical, type-tagged textual encoding.
    ///
    /// Two values have equal encodings iff they are the same value of the
    /// same type; this is the comparison form used by the join operator and
    /// the deduplicating loader. Floats use Rust's shortest round-trip
    /// rendering, timestamps RFC 3339 seconds.
    pub fn canonical(&self) -> String {
        match self {
            Value::Null => "n:".to_string(),
            Value::Int(v) => format!("i:{v}"),
            Value::Float(v) => format!("f:{v}"),
            Value::Text(v) => format!("t:{v}"),
            Value::Timestamp(v) => format!("ts:{}", v.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// The declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 text
    Text,
    /// Date-time without timezone
    Timestamp,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name, unique within its table
    pub name: String,
    /// Declared value type
    pub ty: ColumnType,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An in-memory tabular result.
///
/// Invariants, enforced at construction:
/// - column names are unique within the table
/// - every row holds exactly one value per declared column
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, validating the shape invariants.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::Schema {
                    message: format!("duplicate column name '{}'", col.name),
                });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::Schema {
                    message: format!(
                        "row {} has {} values, expected {}",
                        i,
                        row.len(),
                        columns.len()
                    ),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Create an empty table with the given columns.
    pub fn empty(columns: Vec<Column>) -> Result<Self> {
        Self::new(columns, Vec::new())
    }

    /// The table's columns, in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The table's rows, in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of a column by name, or a [`Error::Schema`] if absent.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::missing_column(name))
    }

    /// Iterate over the values of one column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[index])
    }
}
