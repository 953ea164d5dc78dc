//! Filter executor.
//!
//! Callers write predicates in the store's expression syntax with bare
//! column names; [`rewrite_predicate`] turns every identifier-shaped token
//! that matches a live column into its backtick-quoted, canonical-case form
//! before the predicate reaches statement text. Keeping only the matching
//! rows is implemented destructively: delete everything the predicate does
//! not cover.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::store::StatementRunner;

use super::errors::CleaningError;
use super::identifier::{quote, validate_identifier};
use super::introspect::{self, ColumnInfo};

lazy_static! {
    static ref WORD_RE: Regex =
        Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\b").expect("word regex is valid");

    /// Reserved words of the expression language; never rewritten even when
    /// a column happens to share the name.
    static ref SQL_KEYWORDS: HashSet<&'static str> = [
        "select", "from", "where", "and", "or", "not", "in", "like", "between",
        "is", "null", "true", "false", "as", "order", "by", "group", "having",
        "count", "sum", "avg", "max", "min", "distinct", "case", "when", "then",
        "else", "end", "if", "exists", "all", "any", "some", "union", "join",
        "inner", "left", "right", "outer", "on", "limit", "offset", "top",
    ]
    .iter()
    .copied()
    .collect();
}

/// Rewrite bare column references to quoted canonical-case form.
///
/// A predicate already containing a backtick is taken as hand-quoted and
/// passed through untouched. Words inside string literals are not
/// distinguished from identifiers by this tokenizer.
pub fn rewrite_predicate(predicate: &str, columns: &[ColumnInfo]) -> String {
    let trimmed = predicate.trim();
    if trimmed.contains('`') {
        return trimmed.to_string();
    }

    let canonical: HashMap<String, &str> = columns
        .iter()
        .map(|c| (c.name.to_lowercase(), c.name.as_str()))
        .collect();

    WORD_RE
        .replace_all(trimmed, |caps: &Captures| {
            let word = &caps[1];
            let lowered = word.to_lowercase();
            if SQL_KEYWORDS.contains(lowered.as_str()) {
                return word.to_string();
            }
            match canonical.get(&lowered) {
                Some(name) => quote(name),
                None => word.to_string(),
            }
        })
        .into_owned()
}

/// Outcome of one filter run.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub rows_before: i64,
    pub rows_after: i64,
    pub rewritten: String,
}

impl FilterOutcome {
    pub fn removed(&self) -> i64 {
        self.rows_before - self.rows_after
    }
}

/// Delete every row of `table` that does not satisfy `predicate`.
///
/// Zero deleted rows fail with [`CleaningError::VacuousFilter`]: a filter
/// that matches everything is treated as a likely typo, not a no-op
/// success.
pub async fn filter_rows(
    runner: &dyn StatementRunner,
    table: &str,
    predicate: &str,
) -> Result<FilterOutcome, CleaningError> {
    let table = validate_identifier(table)?;
    if predicate.trim().is_empty() {
        return Err(CleaningError::Validation(
            "filter condition must not be empty".to_string(),
        ));
    }

    introspect::ensure_table_exists(runner, table).await?;
    let rows_before = introspect::count_rows(runner, table).await?;
    let columns = introspect::columns_of(runner, table).await?;

    let rewritten = rewrite_predicate(predicate, &columns);
    runner
        .execute(&format!(
            "DELETE FROM {} WHERE NOT ({})",
            quote(table),
            rewritten
        ))
        .await?;

    let rows_after = introspect::count_rows(runner, table).await?;
    if rows_after == rows_before {
        return Err(CleaningError::VacuousFilter {
            predicate: predicate.to_string(),
            kept: rows_before,
        });
    }

    log::info!(
        "Filtered table '{}' with '{}': kept {} of {} rows",
        table,
        rewritten,
        rows_after,
        rows_before
    );
    Ok(FilterOutcome {
        rows_before,
        rows_after,
        rewritten,
    })
}
