//! Fill executor.
//!
//! Applies a type-appropriate missing-value strategy to every declared
//! column of the dataset. Columns that a strategy does not apply to are
//! skipped with a recorded reason, never failed; only a run in which no
//! column was filled at all becomes an error.

use std::fmt;

use crate::catalog::{FieldKind, FieldMeta};
use crate::store::{params, row_i64, row_value, StatementRunner};

use super::errors::CleaningError;
use super::identifier::{quote, validate_identifier};

/// The fill-strategy vocabulary. `Median`, `Mode` and `BackwardFill` are
/// declared but unimplemented this release: they parse, then skip every
/// column with a recorded reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    Mean,
    Median,
    Mode,
    Zero,
    ForwardFill,
    BackwardFill,
}

impl FillStrategy {
    pub fn parse(name: &str) -> Result<Self, CleaningError> {
        match name.to_lowercase().as_str() {
            "mean" => Ok(FillStrategy::Mean),
            "median" => Ok(FillStrategy::Median),
            "mode" => Ok(FillStrategy::Mode),
            "zero" => Ok(FillStrategy::Zero),
            "forward_fill" => Ok(FillStrategy::ForwardFill),
            "backward_fill" => Ok(FillStrategy::BackwardFill),
            other => Err(CleaningError::Validation(format!(
                "unknown fill strategy: {}",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FillStrategy::Mean => "mean",
            FillStrategy::Median => "median",
            FillStrategy::Mode => "mode",
            FillStrategy::Zero => "zero",
            FillStrategy::ForwardFill => "forward_fill",
            FillStrategy::BackwardFill => "backward_fill",
        }
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct FilledColumn {
    pub field: String,
    pub rows: i64,
}

/// What happened per column: fills with affected-row counts, skips with
/// reasons. Zero fills across the whole run is the caller's error case.
#[derive(Debug, Clone, Default)]
pub struct FillReport {
    pub filled: Vec<FilledColumn>,
    pub skipped: Vec<String>,
}

/// A cell is missing when it is NULL or the empty string; sparse imports
/// routinely store '' where NULL was meant.
fn missing_cell(column: &str) -> String {
    format!("({col} IS NULL OR {col} = '')", col = quote(column))
}

fn count_missing_statement(table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM {} WHERE {}",
        quote(table),
        missing_cell(column)
    )
}

fn count_present_statement(table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM {table} WHERE {col} IS NOT NULL AND {col} != ''",
        table = quote(table),
        col = quote(column)
    )
}

/// Server-side average; rounded for integer-typed columns so the fill value
/// stays assignable, fractional otherwise.
fn average_statement(table: &str, column: &str, rounded: bool) -> String {
    let aggregate = if rounded {
        format!("ROUND(AVG({}))", quote(column))
    } else {
        format!("AVG({})", quote(column))
    };
    format!(
        "SELECT {agg} AS avg_value FROM {table} WHERE {col} IS NOT NULL AND {col} != ''",
        agg = aggregate,
        table = quote(table),
        col = quote(column)
    )
}

fn overwrite_missing_statement(table: &str, column: &str, literal: &str) -> String {
    format!(
        "UPDATE {} SET {} = {} WHERE {}",
        quote(table),
        quote(column),
        literal,
        missing_cell(column)
    )
}

/// Running-state update evaluated in id order: each NULL cell takes the
/// nearest preceding non-null value. Requires the table to expose an `id`
/// ordering column — a documented precondition, detected only by the store
/// rejecting the statement.
fn forward_fill_statement(table: &str, column: &str) -> String {
    format!(
        "UPDATE {table} t1 INNER JOIN (SELECT @prev := NULL) t2 \
         SET t1.{col} = IFNULL(t1.{col}, @prev), @prev := IFNULL(t1.{col}, @prev) \
         ORDER BY t1.id",
        table = quote(table),
        col = quote(column)
    )
}

fn count_null_statement(table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM {} WHERE {} IS NULL",
        quote(table),
        quote(column)
    )
}

async fn fetch_count(
    runner: &dyn StatementRunner,
    statement: &str,
) -> Result<i64, CleaningError> {
    let rows = runner.fetch_rows(statement).await?;
    Ok(rows.first().and_then(|r| row_i64(r, "count")).unwrap_or(0))
}

/// Apply `strategy` to every declared column of `table`.
pub async fn fill_missing(
    runner: &dyn StatementRunner,
    table: &str,
    strategy: FillStrategy,
    fields: &[FieldMeta],
) -> Result<FillReport, CleaningError> {
    let table = validate_identifier(table)?;

    let mut report = FillReport::default();
    for field in fields {
        let name = validate_identifier(&field.field_name)?;
        match strategy {
            FillStrategy::Mean => fill_mean(runner, table, name, field, &mut report).await?,
            FillStrategy::Zero => fill_zero(runner, table, name, field, &mut report).await?,
            FillStrategy::ForwardFill => {
                fill_forward(runner, table, name, &mut report).await?
            }
            FillStrategy::Median | FillStrategy::Mode | FillStrategy::BackwardFill => {
                report.skipped.push(format!(
                    "{}: strategy '{}' is not implemented",
                    name, strategy
                ));
            }
        }
    }

    if report.filled.is_empty() {
        return Err(CleaningError::NoFillableColumns {
            reasons: report.skipped,
        });
    }

    log::info!(
        "Filled {} column(s) on table '{}' with strategy '{}' ({} skipped)",
        report.filled.len(),
        table,
        strategy,
        report.skipped.len()
    );
    Ok(report)
}

async fn fill_mean(
    runner: &dyn StatementRunner,
    table: &str,
    name: &str,
    field: &FieldMeta,
    report: &mut FillReport,
) -> Result<(), CleaningError> {
    if field.kind() != FieldKind::Numeric {
        report.skipped.push(format!(
            "{}: type {} does not support mean fill",
            name, field.field_type
        ));
        return Ok(());
    }

    let present = fetch_count(runner, &count_present_statement(table, name)).await?;
    if present == 0 {
        report
            .skipped
            .push(format!("{}: no non-null values to average", name));
        return Ok(());
    }

    let missing = fetch_count(runner, &count_missing_statement(table, name)).await?;
    if missing == 0 {
        report.skipped.push(format!("{}: no missing values", name));
        return Ok(());
    }

    let avg_rows = runner
        .fetch_rows(&average_statement(table, name, field.is_integer()))
        .await?;
    let average = avg_rows
        .first()
        .and_then(|r| row_value(r, "avg_value"))
        .filter(|v| !v.is_null())
        .cloned();
    let Some(average) = average else {
        report
            .skipped
            .push(format!("{}: average computed as NULL", name));
        return Ok(());
    };

    let literal = params::format_parameter(&average).map_err(crate::store::StoreError::from)?;
    runner
        .execute(&overwrite_missing_statement(table, name, &literal))
        .await?;
    report.filled.push(FilledColumn {
        field: name.to_string(),
        rows: missing,
    });
    Ok(())
}

async fn fill_zero(
    runner: &dyn StatementRunner,
    table: &str,
    name: &str,
    field: &FieldMeta,
    report: &mut FillReport,
) -> Result<(), CleaningError> {
    if field.kind() != FieldKind::Numeric {
        report.skipped.push(format!(
            "{}: type {} does not support zero fill",
            name, field.field_type
        ));
        return Ok(());
    }

    let missing = fetch_count(runner, &count_missing_statement(table, name)).await?;
    if missing == 0 {
        report.skipped.push(format!("{}: no missing values", name));
        return Ok(());
    }

    runner
        .execute(&overwrite_missing_statement(table, name, "0"))
        .await?;
    report.filled.push(FilledColumn {
        field: name.to_string(),
        rows: missing,
    });
    Ok(())
}

async fn fill_forward(
    runner: &dyn StatementRunner,
    table: &str,
    name: &str,
    report: &mut FillReport,
) -> Result<(), CleaningError> {
    let missing = fetch_count(runner, &count_null_statement(table, name)).await?;
    if missing == 0 {
        report.skipped.push(format!("{}: no missing values", name));
        return Ok(());
    }

    // The ordered running-state update needs an id column; the store
    // rejecting it is the skip signal, not a hard failure.
    match runner.execute(&forward_fill_statement(table, name)).await {
        Ok(()) => {
            report.filled.push(FilledColumn {
                field: name.to_string(),
                rows: missing,
            });
        }
        Err(e) => {
            log::warn!(
                "Forward fill skipped for column '{}' on table '{}': {}",
                name,
                table,
                e
            );
            report
                .skipped
                .push(format!("{}: ordered fill rejected by store ({})", name, e));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_vocabulary() {
        assert_eq!(FillStrategy::parse("mean").unwrap(), FillStrategy::Mean);
        assert_eq!(FillStrategy::parse("ZERO").unwrap(), FillStrategy::Zero);
        assert_eq!(
            FillStrategy::parse("Forward_Fill").unwrap(),
            FillStrategy::ForwardFill
        );
        assert_eq!(FillStrategy::parse("median").unwrap(), FillStrategy::Median);
        assert!(matches!(
            FillStrategy::parse("interpolate"),
            Err(CleaningError::Validation(_))
        ));
    }

    #[test]
    fn test_average_statement_rounds_for_integers() {
        let rounded = average_statement("orders", "amount", true);
        assert!(rounded.contains("ROUND(AVG(`amount`))"));
        let fractional = average_statement("orders", "price", false);
        assert!(fractional.contains("AVG(`price`)"));
        assert!(!fractional.contains("ROUND"));
    }

    #[test]
    fn test_overwrite_targets_null_or_empty_cells_only() {
        let sql = overwrite_missing_statement("orders", "amount", "0");
        assert_eq!(
            sql,
            "UPDATE `orders` SET `amount` = 0 WHERE (`amount` IS NULL OR `amount` = '')"
        );
    }

    #[test]
    fn test_forward_fill_orders_by_id() {
        let sql = forward_fill_statement("orders", "amount");
        assert!(sql.contains("@prev := NULL"));
        assert!(sql.contains("IFNULL(t1.`amount`, @prev)"));
        assert!(sql.ends_with("ORDER BY t1.id"));
    }
}
