//! Execution seam between the cleaning engine and the underlying store.
//!
//! The engine never talks to a vendor driver directly: it resolves a logical
//! data-source reference to a [`StatementRunner`] through a
//! [`ConnectionFactory`] and issues generated statement text through that
//! trait. Query results come back as ordered column-to-value mappings
//! (`serde_json` maps with `preserve_order`, so column order survives).

pub mod clickhouse;
pub mod params;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One result row: an ordered mapping from column name to value.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store's query engine rejected a construct it does not implement
    /// (e.g. window functions). Distinguished from [`StoreError::Execution`]
    /// so callers can probe for alternative statement shapes.
    #[error("store does not support the requested construct: {0}")]
    UnsupportedConstruct(String),

    #[error("statement execution failed: {0}")]
    Execution(String),

    #[error("parameter substitution failed: {0}")]
    Parameter(#[from] params::ParameterError),
}

/// Something that can run a statement against one physical connection.
///
/// `execute` is for statements whose only interesting outcome is success or
/// failure (DDL and DML); row deltas are observed by re-counting, not taken
/// from the driver, since not every vendor reports affected rows.
#[async_trait]
pub trait StatementRunner: Send + Sync {
    async fn execute(&self, statement: &str) -> Result<(), StoreError>;

    /// Run a query and return every result row as an ordered
    /// column-to-value map.
    async fn fetch_rows(&self, statement: &str) -> Result<Vec<Row>, StoreError>;
}

/// Yields a runner for a logical data-source reference. Pool construction
/// per vendor lives behind this trait, outside the engine.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn runner_for(&self, source_id: i64) -> Result<Arc<dyn StatementRunner>, StoreError>;
}

/// Read a numeric cell leniently: stores serialize counts as integers,
/// floats or decimal strings depending on the wire format.
pub fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse::<i64>().ok().or_else(|| {
            s.parse::<f64>().ok().map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Look up a cell by column name, tolerating case differences between the
/// alias in the generated statement and the store's catalog conventions.
pub fn row_value<'a>(row: &'a Row, key: &str) -> Option<&'a Value> {
    row.get(key)
        .or_else(|| row.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

pub fn row_i64(row: &Row, key: &str) -> Option<i64> {
    row_value(row, key).and_then(value_to_i64)
}

pub fn row_string(row: &Row, key: &str) -> Option<String> {
    row_value(row, key).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
