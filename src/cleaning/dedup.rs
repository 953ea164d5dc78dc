//! Deduplication executor.
//!
//! Builds a staging table holding one representative row per duplicate-key
//! group, then swaps it into the original table's place. The swap
//! (DELETE, INSERT … SELECT, DROP) is not atomic across its statements: a
//! failure after the DELETE but before the INSERT leaves the table empty.
//! That window is a documented, accepted hazard — it surfaces as a store
//! error and is not rolled back or retried here.

use chrono::Utc;

use crate::store::{StatementRunner, StoreError};

use super::errors::CleaningError;
use super::identifier::{quote, validate_identifier};
use super::introspect::{self, ColumnInfo};

/// Row counts around one dedup run.
#[derive(Debug, Clone, Copy)]
pub struct DedupOutcome {
    pub rows_before: i64,
    pub rows_after: i64,
}

impl DedupOutcome {
    pub fn removed(&self) -> i64 {
        self.rows_before - self.rows_after
    }
}

/// The two interchangeable staging-statement shapes. `WindowRank` is
/// preferred; `GroupBy` is the fallback for stores whose query engine
/// rejects the ranking construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StagingStrategy {
    WindowRank,
    GroupBy,
}

fn quoted_list(names: &[String]) -> String {
    names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(", ")
}

fn staging_statement(
    strategy: StagingStrategy,
    table: &str,
    staging: &str,
    columns: &[ColumnInfo],
    key_fields: &[String],
) -> String {
    let all_columns = columns
        .iter()
        .map(|c| quote(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let keys = quoted_list(key_fields);

    match strategy {
        // Survivor per group is deliberately unspecified: ORDER BY (SELECT
        // NULL) makes the tie-break arbitrary, and callers get no
        // stable-choice guarantee.
        StagingStrategy::WindowRank => format!(
            "CREATE TABLE {staging} AS \
             SELECT {all_columns} FROM (\
             SELECT *, ROW_NUMBER() OVER (PARTITION BY {keys} ORDER BY (SELECT NULL)) AS rn \
             FROM {table}\
             ) t WHERE rn = 1",
            staging = quote(staging),
            all_columns = all_columns,
            keys = keys,
            table = quote(table),
        ),
        // Non-key columns collapse to MIN() per group — first-by-convention.
        StagingStrategy::GroupBy => {
            let select = columns
                .iter()
                .map(|c| {
                    if key_fields.iter().any(|k| k == &c.name) {
                        quote(&c.name)
                    } else {
                        format!("MIN({col}) AS {col}", col = quote(&c.name))
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "CREATE TABLE {staging} AS SELECT {select} FROM {table} GROUP BY {keys}",
                staging = quote(staging),
                select = select,
                table = quote(table),
                keys = keys,
            )
        }
    }
}

/// De-duplicate `table` over `key_fields`.
///
/// Preconditions handled by the caller: key fields are declared columns of
/// the dataset. Identifier legality is (re-)checked here, immediately
/// before statement generation.
pub async fn deduplicate(
    runner: &dyn StatementRunner,
    table: &str,
    key_fields: &[String],
) -> Result<DedupOutcome, CleaningError> {
    let table = validate_identifier(table)?;
    for field in key_fields {
        validate_identifier(field)?;
    }

    introspect::ensure_table_exists(runner, table).await?;
    let rows_before = introspect::count_rows(runner, table).await?;

    let columns = introspect::columns_of(runner, table).await?;
    if columns.is_empty() {
        return Err(CleaningError::Validation(format!(
            "table '{}' reports no columns",
            table
        )));
    }

    let staging = format!("{}_dedup_{}", table, Utc::now().timestamp_millis());
    let staging = validate_identifier(&staging)?;

    // Preferred path: ranking construct. The only automatic retry in the
    // engine hangs off this exact failure kind; any other error aborts with
    // the original table untouched.
    let ranked = staging_statement(StagingStrategy::WindowRank, table, staging, &columns, key_fields);
    match runner.execute(&ranked).await {
        Ok(()) => {}
        Err(StoreError::UnsupportedConstruct(reason)) => {
            log::info!(
                "Ranking construct rejected for table '{}' ({}); retrying with GROUP BY staging",
                table,
                reason
            );
            let grouped =
                staging_statement(StagingStrategy::GroupBy, table, staging, &columns, key_fields);
            runner.execute(&grouped).await?;
        }
        Err(other) => return Err(other.into()),
    }

    let all_columns = columns
        .iter()
        .map(|c| quote(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    // Swap: from here to the INSERT the original table is empty.
    runner.execute(&format!("DELETE FROM {}", quote(table))).await?;
    runner
        .execute(&format!(
            "INSERT INTO {} SELECT {} FROM {}",
            quote(table),
            all_columns,
            quote(staging)
        ))
        .await?;
    runner.execute(&format!("DROP TABLE {}", quote(staging))).await?;

    let rows_after = introspect::count_rows(runner, table).await?;
    let outcome = DedupOutcome {
        rows_before,
        rows_after,
    };
    log::info!(
        "Deduplicated table '{}' on [{}]: {} -> {} rows ({} removed)",
        table,
        key_fields.join(", "),
        outcome.rows_before,
        outcome.rows_after,
        outcome.removed()
    );
    Ok(outcome)
}
