//! Scripted fakes for driving the cleaning engine without a live store.
//!
//! `FakeRunner` replays a queue of canned replies and records every
//! statement it receives, so tests can assert both the generated SQL and
//! the exact call sequence.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use datagov_cleaning::catalog::{Dataset, DatasetRepository, FieldMeta};
use datagov_cleaning::cleaning::errors::CleaningError;
use datagov_cleaning::store::{ConnectionFactory, Row, StatementRunner, StoreError};
use datagov_cleaning::CleaningEngine;

/// Idempotent logger init so failing scenarios can be rerun with
/// `RUST_LOG=debug` for the statement trace.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub enum Reply {
    Rows(Vec<Row>),
    Done,
    Fail(StoreError),
}

/// One canned count-query result.
pub fn count(n: i64) -> Reply {
    Reply::Rows(vec![row(&[("count", json!(n))])])
}

pub fn ok() -> Reply {
    Reply::Done
}

/// Canned INFORMATION_SCHEMA.COLUMNS result.
pub fn columns(specs: &[(&str, &str)]) -> Reply {
    Reply::Rows(
        specs
            .iter()
            .map(|(name, data_type)| {
                row(&[("COLUMN_NAME", json!(name)), ("DATA_TYPE", json!(data_type))])
            })
            .collect(),
    )
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[derive(Default)]
pub struct FakeRunner {
    replies: Mutex<VecDeque<Reply>>,
    statements: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn log(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn next(&self, statement: &str) -> Reply {
        self.statements.lock().unwrap().push(statement.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for statement: {}", statement))
    }
}

#[async_trait]
impl StatementRunner for FakeRunner {
    async fn execute(&self, statement: &str) -> Result<(), StoreError> {
        match self.next(statement) {
            Reply::Done => Ok(()),
            Reply::Fail(e) => Err(e),
            Reply::Rows(_) => panic!("rows scripted where an execute was expected: {}", statement),
        }
    }

    async fn fetch_rows(&self, statement: &str) -> Result<Vec<Row>, StoreError> {
        match self.next(statement) {
            Reply::Rows(rows) => Ok(rows),
            Reply::Fail(e) => Err(e),
            Reply::Done => panic!("execute scripted where rows were expected: {}", statement),
        }
    }
}

pub struct FakeFactory {
    runner: Arc<FakeRunner>,
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    async fn runner_for(&self, _source_id: i64) -> Result<Arc<dyn StatementRunner>, StoreError> {
        Ok(self.runner.clone() as Arc<dyn StatementRunner>)
    }
}

pub struct FakeCatalog {
    datasets: Mutex<HashMap<i64, Dataset>>,
    fields: Mutex<Vec<FieldMeta>>,
    fail_saves: bool,
}

impl FakeCatalog {
    pub fn with(dataset: Dataset, fields: Vec<FieldMeta>) -> Arc<Self> {
        Self::build(dataset, fields, false)
    }

    /// A repository whose writes are rejected, for persistence-failure
    /// scenarios.
    pub fn with_failing_saves(dataset: Dataset, fields: Vec<FieldMeta>) -> Arc<Self> {
        Self::build(dataset, fields, true)
    }

    fn build(dataset: Dataset, fields: Vec<FieldMeta>, fail_saves: bool) -> Arc<Self> {
        let mut datasets = HashMap::new();
        datasets.insert(dataset.id, dataset);
        Arc::new(Self {
            datasets: Mutex::new(datasets),
            fields: Mutex::new(fields),
            fail_saves,
        })
    }

    /// Current stored state of a dataset (post-save view).
    pub fn stored(&self, id: i64) -> Option<Dataset> {
        self.datasets.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl DatasetRepository for FakeCatalog {
    async fn dataset_by_id(&self, id: i64) -> Result<Option<Dataset>, CleaningError> {
        Ok(self.datasets.lock().unwrap().get(&id).cloned())
    }

    async fn save_dataset(&self, dataset: &Dataset) -> Result<Dataset, CleaningError> {
        if self.fail_saves {
            return Err(CleaningError::Catalog(
                "dataset store rejected the update".to_string(),
            ));
        }
        self.datasets
            .lock()
            .unwrap()
            .insert(dataset.id, dataset.clone());
        Ok(dataset.clone())
    }

    async fn fields_of(&self, dataset_id: i64) -> Result<Vec<FieldMeta>, CleaningError> {
        Ok(self
            .fields
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.dataset_id == dataset_id)
            .cloned()
            .collect())
    }
}

pub fn dataset_with_source(id: i64, table: &str) -> Dataset {
    Dataset {
        id,
        name: table.to_string(),
        location: None,
        data_source_id: Some(7),
        table_name: Some(table.to_string()),
        description: Some("Orders dataset.".to_string()),
        row_count: None,
    }
}

pub fn dataset_with_location(id: i64, location: &str) -> Dataset {
    Dataset {
        id,
        name: location.to_string(),
        location: Some(location.to_string()),
        data_source_id: None,
        table_name: None,
        description: None,
        row_count: None,
    }
}

pub fn field(dataset_id: i64, name: &str, field_type: &str) -> FieldMeta {
    FieldMeta {
        dataset_id,
        field_name: name.to_string(),
        field_type: field_type.to_string(),
        is_nullable: true,
    }
}

/// Engine wired to the fakes, factory-routed only.
pub fn engine(catalog: Arc<FakeCatalog>, runner: Arc<FakeRunner>) -> CleaningEngine {
    CleaningEngine::new(catalog, Arc::new(FakeFactory { runner }), None)
}

/// Engine with the local default store bound, for location-based datasets.
pub fn engine_with_local(catalog: Arc<FakeCatalog>, runner: Arc<FakeRunner>) -> CleaningEngine {
    CleaningEngine::new(
        catalog,
        Arc::new(FakeFactory {
            runner: runner.clone(),
        }),
        Some(runner as Arc<dyn StatementRunner>),
    )
}
