//! The cleaning engine: one facade over the dedup, filter and fill
//! executors plus the multi-step orchestration.
//!
//! Every operation is a single synchronous call stack per invocation: no
//! background work, no internal parallelism, no timeout or cancellation
//! beyond what the underlying store enforces. Callers must serialize
//! cleaning operations per table themselves; the engine does not.

pub mod dedup;
pub mod errors;
pub mod fill;
pub mod filter;
pub mod identifier;
pub mod introspect;
pub mod resolver;

use std::sync::Arc;

use crate::catalog::{Dataset, DatasetRepository};
use crate::store::{ConnectionFactory, StatementRunner};

use errors::CleaningError;
use fill::FillStrategy;
use resolver::TableResolver;

// Per-step defaults used by the orchestrated pipeline.
const DEFAULT_DEDUP_KEY: &str = "id";
const DEFAULT_FILTER_PREDICATE: &str = "id > 0";
const DEFAULT_FILL_STRATEGY: &str = "mean";
const DEFAULT_FORMAT_RULES: [&str; 2] = ["date_format", "number_format"];

/// Fixed vocabulary of orchestrated pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleaningStep {
    Deduplicate,
    Filter,
    FillMissing,
    Format,
}

impl CleaningStep {
    fn parse(name: &str) -> Result<Self, CleaningError> {
        match name.to_lowercase().as_str() {
            "deduplicate" => Ok(CleaningStep::Deduplicate),
            "filter" => Ok(CleaningStep::Filter),
            "fillmissing" => Ok(CleaningStep::FillMissing),
            "format" => Ok(CleaningStep::Format),
            other => Err(CleaningError::Validation(format!(
                "unknown cleaning step: {}",
                other
            ))),
        }
    }
}

pub struct CleaningEngine {
    datasets: Arc<dyn DatasetRepository>,
    resolver: TableResolver,
}

impl CleaningEngine {
    /// `local` is the optional default store binding for datasets addressed
    /// only by `location`; passing `None` disables that resolution path.
    pub fn new(
        datasets: Arc<dyn DatasetRepository>,
        factory: Arc<dyn ConnectionFactory>,
        local: Option<Arc<dyn StatementRunner>>,
    ) -> Self {
        Self {
            datasets,
            resolver: TableResolver::new(factory, local),
        }
    }

    async fn dataset(&self, dataset_id: i64) -> Result<Dataset, CleaningError> {
        self.datasets
            .dataset_by_id(dataset_id)
            .await?
            .ok_or_else(|| {
                CleaningError::Validation(format!("dataset not found: {}", dataset_id))
            })
    }

    /// Remove duplicate rows, judged over the ordered `key_fields`.
    pub async fn remove_duplicates(
        &self,
        dataset_id: i64,
        key_fields: &[String],
    ) -> Result<Dataset, CleaningError> {
        if key_fields.is_empty() {
            return Err(CleaningError::Validation(
                "duplicate key must name at least one field".to_string(),
            ));
        }

        let mut dataset = self.dataset(dataset_id).await?;

        // Caller-supplied field names must come off the declared-column
        // allow-list before anything touches the store.
        let declared = self.datasets.fields_of(dataset_id).await?;
        for field in key_fields {
            if !declared.iter().any(|m| &m.field_name == field) {
                return Err(CleaningError::FieldNotFound {
                    dataset_id,
                    field: field.clone(),
                });
            }
        }

        let resolved = self.resolver.resolve(&dataset).await?;
        let outcome =
            dedup::deduplicate(resolved.runner.as_ref(), &resolved.table, key_fields).await?;

        dataset.row_count = Some(outcome.rows_after);
        let detail = if outcome.removed() > 0 {
            format!("removed {} duplicate row(s)", outcome.removed())
        } else {
            "no duplicate rows found".to_string()
        };
        dataset.append_note(&format!(
            "[deduplicate, field(s): {}, {}]",
            key_fields.join(", "),
            detail
        ));
        self.datasets.save_dataset(&dataset).await
    }

    /// Keep only the rows satisfying `predicate` (store expression syntax,
    /// bare column names allowed).
    pub async fn filter_rows(
        &self,
        dataset_id: i64,
        predicate: &str,
    ) -> Result<Dataset, CleaningError> {
        if predicate.trim().is_empty() {
            return Err(CleaningError::Validation(
                "filter condition must not be empty".to_string(),
            ));
        }

        let mut dataset = self.dataset(dataset_id).await?;
        let resolved = self.resolver.resolve(&dataset).await?;
        let outcome =
            filter::filter_rows(resolved.runner.as_ref(), &resolved.table, predicate).await?;

        dataset.row_count = Some(outcome.rows_after);
        dataset.append_note(&format!(
            "[filter, condition: {}, kept {} of {} row(s)]",
            predicate.trim(),
            outcome.rows_after,
            outcome.rows_before
        ));
        self.datasets.save_dataset(&dataset).await
    }

    /// Fill missing values in every declared column using the named
    /// strategy.
    pub async fn fill_missing(
        &self,
        dataset_id: i64,
        strategy_name: &str,
    ) -> Result<Dataset, CleaningError> {
        if strategy_name.trim().is_empty() {
            return Err(CleaningError::Validation(
                "fill strategy must not be empty".to_string(),
            ));
        }
        let strategy = FillStrategy::parse(strategy_name)?;

        let mut dataset = self.dataset(dataset_id).await?;
        let declared = self.datasets.fields_of(dataset_id).await?;
        if declared.is_empty() {
            return Err(CleaningError::Validation(format!(
                "dataset {} has no declared field metadata",
                dataset_id
            )));
        }

        let resolved = self.resolver.resolve(&dataset).await?;
        let report =
            fill::fill_missing(resolved.runner.as_ref(), &resolved.table, strategy, &declared)
                .await?;

        let filled = report
            .filled
            .iter()
            .map(|f| format!("{}({} rows)", f.field, f.rows))
            .collect::<Vec<_>>()
            .join(", ");
        let mut note = format!(
            "[fillmissing, strategy: {}, filled field(s): {}",
            strategy, filled
        );
        if !report.skipped.is_empty() {
            note.push_str(&format!(
                ", skipped: {}",
                truncated(&report.skipped.join("; "), 160)
            ));
        }
        note.push(']');
        dataset.append_note(&note);
        self.datasets.save_dataset(&dataset).await
    }

    /// Placeholder format step: validates the rule list and records the
    /// operation; no data is touched.
    pub async fn format_values(
        &self,
        dataset_id: i64,
        rules: &[String],
    ) -> Result<Dataset, CleaningError> {
        if rules.is_empty() {
            return Err(CleaningError::Validation(
                "format rule list must not be empty".to_string(),
            ));
        }

        let mut dataset = self.dataset(dataset_id).await?;
        dataset.append_note(&format!(
            "[format, rule(s): {}, no changes applied]",
            rules.join(", ")
        ));
        self.datasets.save_dataset(&dataset).await
    }

    /// Run an ordered subset of {deduplicate, filter, fillmissing, format}
    /// against one dataset, each step consuming the state left by the
    /// previous one. Every step name is validated before any step runs.
    pub async fn run_pipeline(
        &self,
        dataset_id: i64,
        steps: &[String],
    ) -> Result<Dataset, CleaningError> {
        if steps.is_empty() {
            return Err(CleaningError::Validation(
                "cleaning step list must not be empty".to_string(),
            ));
        }
        let parsed: Vec<CleaningStep> = steps
            .iter()
            .map(|s| CleaningStep::parse(s))
            .collect::<Result<_, _>>()?;

        let mut dataset = self.dataset(dataset_id).await?;
        for step in parsed {
            log::info!("Pipeline step {:?} on dataset {}", step, dataset_id);
            dataset = match step {
                CleaningStep::Deduplicate => {
                    self.remove_duplicates(dataset_id, &[DEFAULT_DEDUP_KEY.to_string()])
                        .await?
                }
                CleaningStep::Filter => {
                    self.filter_rows(dataset_id, DEFAULT_FILTER_PREDICATE).await?
                }
                CleaningStep::FillMissing => {
                    self.fill_missing(dataset_id, DEFAULT_FILL_STRATEGY).await?
                }
                CleaningStep::Format => {
                    let rules: Vec<String> =
                        DEFAULT_FORMAT_RULES.iter().map(|r| r.to_string()).collect();
                    self.format_values(dataset_id, &rules).await?
                }
            };
        }

        dataset.append_note(&format!(
            "[cleaning pipeline completed, step(s): {}]",
            steps.join(", ")
        ));
        self.datasets.save_dataset(&dataset).await
    }
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
