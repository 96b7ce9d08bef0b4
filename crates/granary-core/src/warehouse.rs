//! Warehouse stores and the append-if-new load algorithm
//!
//! A [`WarehouseStore`] is the persistence seam: fetch a table's current
//! contents, append rows. [`load_append_new`] sits on top and appends only
//! rows that are not already present, which is what makes repeated pipeline
//! runs idempotent despite the append-only load mode.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::table::{ColumnType, Table, Value};
use crate::transform::convert_value;

/// Persistence operations a warehouse must offer.
///
/// Stores never delete or update rows; tables grow monotonically through
/// [`WarehouseStore::append`].
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    /// Read the full current contents of `table`.
    async fn fetch_all(&self, table: &str) -> Result<Table>;

    /// Append `batch` to `table`, returning the number of rows written.
    async fn append(&self, table: &str, batch: &Table) -> Result<u64>;
}

/// Result of one append-if-new load.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Target warehouse table
    pub table: String,
    /// Rows actually appended
    pub appended: u64,
    /// Batch rows skipped because they already existed
    pub skipped: u64,
}

/// Append only the rows of `batch` that are not already present in `table`.
///
/// Both sides are canonicalized by the batch's declared column types before
/// comparison - integers compare as integers, floats through a canonical
/// rendering, timestamps as instants - so a value persisted as text and
/// read back still matches its typed original. An existing value that
/// cannot be read as the batch column's type never matches, which can only
/// over-append, never lose rows.
///
/// The dedup key is the full row, not a declared business key: a target
/// table whose columns differ from the batch's matches nothing, and the
/// whole batch loads. Known limitation, kept deliberately.
pub async fn load_append_new(
    store: &dyn WarehouseStore,
    table: &str,
    batch: &Table,
) -> Result<LoadOutcome> {
    if batch.is_empty() {
        tracing::info!(table, "batch is empty, nothing to load");
        return Ok(LoadOutcome {
            table: table.to_string(),
            appended: 0,
            skipped: 0,
        });
    }

    let existing = store.fetch_all(table).await?;
    let types: Vec<(&str, ColumnType)> = batch
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.ty))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    if let Some(mapping) = column_mapping(&existing, &types) {
        for row in existing.rows() {
            seen.insert(row_key(
                mapping.iter().map(|&i| &row[i]),
                types.iter().copied(),
            ));
        }
    }

    let mut new_rows = Vec::new();
    let mut skipped = 0u64;
    for row in batch.rows() {
        let key = row_key(row.iter(), types.iter().copied());
        if seen.insert(key) {
            new_rows.push(row.clone());
        } else {
            skipped += 1;
        }
    }

    let appended = new_rows.len() as u64;
    if !new_rows.is_empty() {
        let to_load = Table::new(batch.columns().to_vec(), new_rows)?;
        store.append(table, &to_load).await?;
    }

    tracing::info!(table, appended, skipped, "append-if-new load finished");
    Ok(LoadOutcome {
        table: table.to_string(),
        appended,
        skipped,
    })
}

/// For each batch column, the index of the same-named column in `existing`.
/// `None` when any batch column is absent - full-row identity is then
/// undefined and no existing row can match.
fn column_mapping(existing: &Table, types: &[(&str, ColumnType)]) -> Option<Vec<usize>> {
    types
        .iter()
        .map(|(name, _)| existing.column_index(name))
        .collect()
}

/// Canonical full-row key under the batch's declared column types.
fn row_key<'a>(
    values: impl Iterator<Item = &'a Value>,
    types: impl Iterator<Item = (&'a str, ColumnType)>,
) -> String {
    let mut key = String::new();
    for (value, (name, ty)) in values.zip(types) {
        let cell = convert_value(value, ty, name)
            .map(|v| v.canonical())
            .unwrap_or_else(|_| value.canonical());
        key.push_str(&cell);
        key.push('\u{1f}');
    }
    key
}

/// In-process warehouse for local development and tests.
///
/// Clones share the same underlying tables, like independent handles onto
/// one database.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl MemoryWarehouse {
    /// Create an empty warehouse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of `table`, if it has ever been written.
    pub async fn table(&self, name: &str) -> Option<Table> {
        self.tables.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl WarehouseStore for MemoryWarehouse {
    async fn fetch_all(&self, table: &str) -> Result<Table> {
        let tables = self.tables.lock().await;
        match tables.get(table) {
            Some(t) => Ok(t.clone()),
            // An unseen table reads as empty; creation is the DDL's problem.
            None => Table::empty(Vec::new()),
        }
    }

    async fn append(&self, table: &str, batch: &Table) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let merged = match tables.get(table) {
            Some(existing) => {
                let existing_names: Vec<&str> =
                    existing.columns().iter().map(|c| c.name.as_str()).collect();
                let batch_names: Vec<&str> =
                    batch.columns().iter().map(|c| c.name.as_str()).collect();
                if existing_names != batch_names {
                    return Err(Error::Load {
                        table: table.to_string(),
                        message: format!(
                            "batch columns {batch_names:?} do not match table columns {existing_names:?}"
                        ),
                    });
                }
                let mut rows = existing.rows().to_vec();
                rows.extend(batch.rows().iter().cloned());
                Table::new(existing.columns().to_vec(), rows).map_err(|e| Error::Load {
                    table: table.to_string(),
                    message: e.to_string(),
                })?
            }
            None => batch.clone(),
        };
        tables.insert(table.to_string(), merged);
        Ok(batch.len() as u64)
    }
}
