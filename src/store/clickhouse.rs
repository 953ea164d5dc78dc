//! ClickHouse-backed [`StatementRunner`].
//!
//! Rows are fetched as `JSONEachRow` and parsed line by line, which keeps
//! the result shape generic over tables whose structure is unknown until
//! runtime. Vendor errors that indicate a rejected query construct (rather
//! than a failed execution) are classified as
//! [`StoreError::UnsupportedConstruct`] so the dedup executor can retry with
//! an alternative statement shape.

use async_trait::async_trait;
use clickhouse::Client;
use tokio::io::AsyncBufReadExt;

use super::{Row, StatementRunner, StoreError};

pub struct ClickHouseRunner {
    client: Client,
}

impl ClickHouseRunner {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a runner from raw connection settings.
    pub fn connect(url: &str, user: &str, password: &str, database: &str) -> Self {
        Self::new(
            Client::default()
                .with_url(url)
                .with_user(user)
                .with_password(password)
                .with_database(database)
                .with_option("join_use_nulls", "1") // Return NULL for unmatched LEFT JOIN columns
                .with_option("input_format_binary_read_json_as_string", "1")
                .with_option("output_format_binary_write_json_as_string", "1"),
        )
    }
}

/// Map a driver error onto the store taxonomy. Messages naming an unknown
/// or unimplemented function/feature mean the construct itself was rejected;
/// everything else is a plain execution failure.
fn classify(err: clickhouse::error::Error) -> StoreError {
    classify_message(err.to_string())
}

fn classify_message(message: String) -> StoreError {
    let lowered = message.to_lowercase();
    if lowered.contains("unknown function")
        || lowered.contains("not implemented")
        || lowered.contains("not supported")
        || lowered.contains("unsupported")
    {
        StoreError::UnsupportedConstruct(message)
    } else {
        StoreError::Execution(message)
    }
}

#[async_trait]
impl StatementRunner for ClickHouseRunner {
    async fn execute(&self, statement: &str) -> Result<(), StoreError> {
        log::debug!("Executing statement:\n{}", statement);
        self.client
            .query(statement)
            .execute()
            .await
            .map_err(|e| {
                log::error!("Statement failed. SQL was:\n{}\nError: {}", statement, e);
                classify(e)
            })
    }

    async fn fetch_rows(&self, statement: &str) -> Result<Vec<Row>, StoreError> {
        log::debug!("Fetching rows:\n{}", statement);
        let mut lines = self
            .client
            .query(statement)
            .fetch_bytes("JSONEachRow")
            .map_err(|e| {
                log::error!("Query failed. SQL was:\n{}\nError: {}", statement, e);
                classify(e)
            })?
            .lines();

        let mut rows: Vec<Row> = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StoreError::Execution(e.to_string()))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let row: Row = serde_json::from_str(&line).map_err(|e| {
                StoreError::Execution(format!("malformed result row '{}': {}", line, e))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_construct_classification() {
        for msg in [
            "Code: 46. DB::Exception: Unknown function row_number",
            "Code: 48. DB::Exception: Window functions are NOT IMPLEMENTED here",
            "feature is not supported in this build",
        ] {
            assert!(
                matches!(
                    classify_message(msg.to_string()),
                    StoreError::UnsupportedConstruct(_)
                ),
                "expected '{}' to classify as unsupported",
                msg
            );
        }
    }

    #[test]
    fn test_plain_failures_stay_execution_errors() {
        assert!(matches!(
            classify_message("Code: 60. DB::Exception: Table default.t doesn't exist".to_string()),
            StoreError::Execution(_)
        ));
    }
}
