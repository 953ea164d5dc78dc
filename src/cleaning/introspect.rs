//! Live table introspection against the resolved connection.
//!
//! Asks the store's own catalog for existence and the ordered column list.
//! Nothing here is cached: column sets can change between calls and the
//! executors always work against what the store reports right now. The
//! table name reaches these queries as a bound parameter, not as spliced
//! statement text.

use serde_json::json;

use crate::store::{params, row_i64, row_string, StatementRunner, StoreError};

use super::errors::CleaningError;
use super::identifier::quote;

/// One live column as reported by the store.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Fail with [`CleaningError::TableNotFound`] unless the store's catalog
/// lists the table in the current schema.
pub async fn ensure_table_exists(
    runner: &dyn StatementRunner,
    table: &str,
) -> Result<(), CleaningError> {
    let statement = params::substitute_parameters(
        "SELECT COUNT(*) AS count FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = $table",
        &params::single("table", json!(table)),
    )
    .map_err(StoreError::from)?;

    let rows = runner.fetch_rows(&statement).await?;
    let present = rows.first().and_then(|r| row_i64(r, "count")).unwrap_or(0);
    if present == 0 {
        return Err(CleaningError::TableNotFound(table.to_string()));
    }
    Ok(())
}

/// Ordered (by ordinal position) list of live columns.
pub async fn columns_of(
    runner: &dyn StatementRunner,
    table: &str,
) -> Result<Vec<ColumnInfo>, CleaningError> {
    let statement = params::substitute_parameters(
        "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = $table \
         ORDER BY ORDINAL_POSITION",
        &params::single("table", json!(table)),
    )
    .map_err(StoreError::from)?;

    let rows = runner.fetch_rows(&statement).await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = row_string(row, "COLUMN_NAME").ok_or_else(|| {
            StoreError::Execution(format!(
                "catalog row for table '{}' is missing COLUMN_NAME",
                table
            ))
        })?;
        let data_type = row_string(row, "DATA_TYPE").unwrap_or_default();
        columns.push(ColumnInfo { name, data_type });
    }
    log::debug!("Table '{}' has {} live column(s)", table, columns.len());
    Ok(columns)
}

/// Current row count of a validated table.
pub async fn count_rows(runner: &dyn StatementRunner, table: &str) -> Result<i64, CleaningError> {
    let statement = format!("SELECT COUNT(*) AS count FROM {}", quote(table));
    let rows = runner.fetch_rows(&statement).await?;
    rows.first()
        .and_then(|r| row_i64(r, "count"))
        .ok_or_else(|| {
            CleaningError::Store(StoreError::Execution(format!(
                "count query for table '{}' returned no usable row",
                table
            )))
        })
}
