//! Maps a dataset's stored configuration to one (connection, table) pair.

use std::sync::Arc;

use crate::catalog::Dataset;
use crate::store::{ConnectionFactory, StatementRunner};

use super::errors::CleaningError;

/// Resolution result. The table name is raw at this point; callers must
/// pass it through the identifier gate before statement generation.
pub struct ResolvedTable {
    pub runner: Arc<dyn StatementRunner>,
    pub table: String,
}

impl std::fmt::Debug for ResolvedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTable")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Resolution order: explicit (data source, table name) pair first, then
/// the dataset `location` against the optional local default store.
///
/// The local default store is process-wide configuration bound at init time
/// and passed in explicitly; there is no global fallback.
pub struct TableResolver {
    factory: Arc<dyn ConnectionFactory>,
    local: Option<Arc<dyn StatementRunner>>,
}

impl TableResolver {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        local: Option<Arc<dyn StatementRunner>>,
    ) -> Self {
        Self { factory, local }
    }

    pub async fn resolve(&self, dataset: &Dataset) -> Result<ResolvedTable, CleaningError> {
        if let (Some(source_id), Some(table)) =
            (dataset.data_source_id, dataset.table_name.as_deref())
        {
            log::debug!(
                "Resolving dataset {} via data source {} / table '{}'",
                dataset.id,
                source_id,
                table
            );
            let runner = self.factory.runner_for(source_id).await?;
            return Ok(ResolvedTable {
                runner,
                table: table.to_string(),
            });
        }

        if let Some(location) = dataset
            .location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
        {
            if let Some(local) = &self.local {
                let table = table_name_from_location(location);
                log::debug!(
                    "Resolving dataset {} via location '{}' -> local table '{}'",
                    dataset.id,
                    location,
                    table
                );
                return Ok(ResolvedTable {
                    runner: Arc::clone(local),
                    table,
                });
            }
        }

        Err(CleaningError::Configuration(format!(
            "dataset {} carries neither a (data source, table name) pair nor a location usable with the local default store",
            dataset.id
        )))
    }
}

/// A location may carry a qualified name ("db.table", "catalog.db.table");
/// only the last segment is the table name.
pub fn table_name_from_location(location: &str) -> String {
    let trimmed = location.trim();
    trimmed
        .rsplit('.')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}
