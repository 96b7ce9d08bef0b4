//! PostgreSQL source and warehouse adapters
//!
//! Both adapters open a connection per call and close it before returning;
//! a batch run pays full connect cost on every read and write rather than
//! holding state between steps.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column as _, Connection, QueryBuilder, Row, TypeInfo};

use granary_core::error::{Error, Result};
use granary_core::source::QuerySource;
use granary_core::table::{Column, ColumnType, Table, Value};
use granary_core::warehouse::WarehouseStore;

/// Rows bound per INSERT statement; keeps parameter counts well under the
/// wire protocol limit.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Query source backed by a PostgreSQL database.
pub struct PgQuerySource {
    url: String,
}

impl PgQuerySource {
    /// Create a source for the given connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl QuerySource for PgQuerySource {
    async fn fetch(&self, query: &str) -> Result<Table> {
        let mut conn = connect(&self.url, "source database").await?;
        let rows = sqlx::query(query)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| Error::Query {
                message: e.to_string(),
            })?;
        let table = rows_to_table(&rows)?;
        let _ = conn.close().await;
        Ok(table)
    }
}

/// Warehouse backed by a PostgreSQL database.
pub struct PgWarehouse {
    url: String,
}

impl PgWarehouse {
    /// Create a warehouse handle for the given connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl WarehouseStore for PgWarehouse {
    async fn fetch_all(&self, table: &str) -> Result<Table> {
        let mut conn = connect(&self.url, "warehouse database").await?;
        let query = format!("SELECT * FROM {}", quote_ident(table));
        let rows = sqlx::query(&query)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| Error::Query {
                message: e.to_string(),
            })?;
        let result = rows_to_table(&rows)?;
        let _ = conn.close().await;
        Ok(result)
    }

    async fn append(&self, table: &str, batch: &Table) -> Result<u64> {
        let load_error = |message: String| Error::Load {
            table: table.to_string(),
            message,
        };

        let mut conn = connect(&self.url, "warehouse database")
            .await
            .map_err(|e| load_error(e.to_string()))?;

        let column_list = batch
            .columns()
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let prefix = format!("INSERT INTO {} ({}) ", quote_ident(table), column_list);

        let mut written = 0u64;
        for chunk in batch.rows().chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut b, row| {
                for (value, column) in row.iter().zip(batch.columns()) {
                    bind_value(&mut b, value, column.ty);
                }
            });
            let result = builder
                .build()
                .execute(&mut conn)
                .await
                .map_err(|e| load_error(e.to_string()))?;
            written += result.rows_affected();
        }

        let _ = conn.close().await;
        Ok(written)
    }
}

async fn connect(url: &str, endpoint: &str) -> Result<PgConnection> {
    PgConnection::connect(url)
        .await
        .map_err(|e| Error::Connection {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
}

/// Quote a SQL identifier; `dimMovie` and friends are case-sensitive.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn bind_value(
    b: &mut sqlx::query_builder::Separated<'_, '_, sqlx::Postgres, &'static str>,
    value: &Value,
    ty: ColumnType,
) {
    match value {
        // Typed NULLs so the parameter type matches the column.
        Value::Null => match ty {
            ColumnType::Int => b.push_bind(None::<i64>),
            ColumnType::Float => b.push_bind(None::<f64>),
            ColumnType::Text => b.push_bind(None::<String>),
            ColumnType::Timestamp => b.push_bind(None::<NaiveDateTime>),
        },
        Value::Int(v) => b.push_bind(*v),
        Value::Float(v) => b.push_bind(*v),
        Value::Text(s) => b.push_bind(s.clone()),
        Value::Timestamp(ts) => b.push_bind(*ts),
    };
}

/// Decode a result set into a [`Table`] by inspecting column type info.
///
/// An empty result set carries no column metadata and decodes to an empty,
/// column-less table.
fn rows_to_table(rows: &[PgRow]) -> Result<Table> {
    let Some(first) = rows.first() else {
        return Table::empty(Vec::new());
    };

    let columns: Vec<Column> = first
        .columns()
        .iter()
        .map(|c| {
            let ty = column_type_for(c.type_info().name()).ok_or_else(|| Error::Query {
                message: format!(
                    "unsupported column type '{}' in column '{}'",
                    c.type_info().name(),
                    c.name()
                ),
            })?;
            Ok(Column::new(c.name(), ty))
        })
        .collect::<Result<_>>()?;

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for (i, column) in row.columns().iter().enumerate() {
            values.push(decode_cell(row, i, column.type_info().name())?);
        }
        decoded.push(values);
    }
    Table::new(columns, decoded)
}

fn column_type_for(pg_type: &str) -> Option<ColumnType> {
    match pg_type {
        "INT2" | "INT4" | "INT8" | "BOOL" => Some(ColumnType::Int),
        "FLOAT4" | "FLOAT8" => Some(ColumnType::Float),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => Some(ColumnType::Text),
        "DATE" | "TIMESTAMP" | "TIMESTAMPTZ" => Some(ColumnType::Timestamp),
        _ => None,
    }
}

fn decode_cell(row: &PgRow, i: usize, pg_type: &str) -> Result<Value> {
    let decode_error = |e: sqlx::Error| Error::Query {
        message: format!("failed to decode column {i}: {e}"),
    };

    let value = match pg_type {
        "INT2" => row
            .try_get::<Option<i16>, _>(i)
            .map_err(decode_error)?
            .map(|v| Value::Int(v.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(i)
            .map_err(decode_error)?
            .map(|v| Value::Int(v.into())),
        "INT8" => row
            .try_get::<Option<i64>, _>(i)
            .map_err(decode_error)?
            .map(Value::Int),
        "BOOL" => row
            .try_get::<Option<bool>, _>(i)
            .map_err(decode_error)?
            .map(|v| Value::Int(v.into())),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)
            .map_err(decode_error)?
            .map(|v| Value::Float(v.into())),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(i)
            .map_err(decode_error)?
            .map(Value::Float),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(i)
            .map_err(decode_error)?
            .map(Value::Text),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(i)
            .map_err(decode_error)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Value::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(i)
            .map_err(decode_error)?
            .map(Value::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(i)
            .map_err(decode_error)?
            .map(|v| Value::Timestamp(v.naive_utc())),
        other => {
            return Err(Error::Query {
                message: format!("unsupported column type '{other}' in column {i}"),
            });
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
