//! Error taxonomy for the cleaning engine.
//!
//! Every error aborts the current operation in full; partial progress is
//! never reported as success. The only automatic retry in the engine is the
//! dedup staging-strategy switch on [`StoreError::UnsupportedConstruct`].

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CleaningError {
    /// The dataset record cannot be resolved to one (connection, table)
    /// pair: no (data source, table name) pair, and no usable location with
    /// a configured local default store.
    #[error("Dataset cannot be resolved to a connection and table: {0}")]
    Configuration(String),

    /// Illegal identifier, unknown dataset, or an empty predicate /
    /// strategy / step list.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A caller-supplied field name is not a declared column of the dataset.
    #[error("Field '{field}' is not declared on dataset {dataset_id}")]
    FieldNotFound { dataset_id: i64, field: String },

    /// The filter deleted nothing — treated as a likely predicate typo
    /// rather than a valid empty result.
    #[error("Filter condition '{predicate}' removed no rows (all {kept} rows matched); check the condition")]
    VacuousFilter { predicate: String, kept: i64 },

    /// Every column was skipped by the fill strategy; carries the collected
    /// per-column skip reasons.
    #[error("No columns were filled: {}", reasons.join("; "))]
    NoFillableColumns { reasons: Vec<String> },

    #[error("Store execution failed: {0}")]
    Store(#[from] StoreError),

    /// Failure surfaced by the catalog collaborator (dataset or metadata
    /// lookup/persist).
    #[error("Catalog operation failed: {0}")]
    Catalog(String),
}
