//! Dataset and field-metadata records plus the repository seam to the
//! surrounding catalog service.
//!
//! The catalog owns these records; the cleaning engine only reads them,
//! appends audit sentences to the description and persists updated row
//! counts through [`DatasetRepository`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cleaning::errors::CleaningError;

/// A logical dataset as stored by the catalog. Either the explicit
/// (`data_source_id`, `table_name`) pair or the `location` string decides
/// which physical table the cleaning operations touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub data_source_id: Option<i64>,
    pub table_name: Option<String>,
    /// Free text; cleaning operations append bracketed audit sentences here.
    pub description: Option<String>,
    pub row_count: Option<i64>,
}

impl Dataset {
    /// Append an audit sentence to the running description log.
    pub fn append_note(&mut self, note: &str) {
        let current = self.description.take().unwrap_or_default();
        let updated = if current.is_empty() {
            note.to_string()
        } else {
            format!("{} {}", current, note)
        };
        self.description = Some(updated);
    }
}

/// Declared column metadata for one dataset field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMeta {
    pub dataset_id: i64,
    pub field_name: String,
    /// Declared store type, e.g. "INT", "DECIMAL(10,2)", "VARCHAR(64)".
    pub field_type: String,
    pub is_nullable: bool,
}

/// Coarse type tag used to decide fill-strategy applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Text,
    Temporal,
    Other,
}

impl FieldMeta {
    pub fn kind(&self) -> FieldKind {
        let upper = self.field_type.to_uppercase();
        if upper.contains("INT")
            || upper.contains("DECIMAL")
            || upper.contains("FLOAT")
            || upper.contains("DOUBLE")
            || upper.contains("NUMERIC")
        {
            FieldKind::Numeric
        } else if upper.contains("CHAR") || upper.contains("TEXT") || upper.contains("STRING") {
            FieldKind::Text
        } else if upper.contains("DATE") || upper.contains("TIME") {
            FieldKind::Temporal
        } else {
            FieldKind::Other
        }
    }

    /// Integer-typed columns get their computed averages rounded; fractional
    /// types keep precision.
    pub fn is_integer(&self) -> bool {
        self.field_type.to_uppercase().contains("INT")
    }
}

/// Persistence seam to the catalog. Implemented by the surrounding service
/// layer; plain CRUD on these records is out of scope for the engine.
#[async_trait]
pub trait DatasetRepository: Send + Sync {
    async fn dataset_by_id(&self, id: i64) -> Result<Option<Dataset>, CleaningError>;

    async fn save_dataset(&self, dataset: &Dataset) -> Result<Dataset, CleaningError>;

    /// Declared field metadata for one dataset, in declaration order.
    async fn fields_of(&self, dataset_id: i64) -> Result<Vec<FieldMeta>, CleaningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(field_type: &str) -> FieldMeta {
        FieldMeta {
            dataset_id: 1,
            field_name: "f".to_string(),
            field_type: field_type.to_string(),
            is_nullable: true,
        }
    }

    #[test]
    fn test_field_kind_classification() {
        assert_eq!(meta("INT").kind(), FieldKind::Numeric);
        assert_eq!(meta("decimal(10,2)").kind(), FieldKind::Numeric);
        assert_eq!(meta("DOUBLE").kind(), FieldKind::Numeric);
        assert_eq!(meta("VARCHAR(64)").kind(), FieldKind::Text);
        assert_eq!(meta("String").kind(), FieldKind::Text);
        assert_eq!(meta("DATETIME").kind(), FieldKind::Temporal);
        assert_eq!(meta("JSON").kind(), FieldKind::Other);
    }

    #[test]
    fn test_integer_detection() {
        assert!(meta("BIGINT").is_integer());
        assert!(!meta("DECIMAL(10,2)").is_integer());
    }

    #[test]
    fn test_append_note() {
        let mut ds = Dataset {
            id: 1,
            name: "orders".to_string(),
            location: None,
            data_source_id: None,
            table_name: None,
            description: None,
            row_count: None,
        };
        ds.append_note("[first]");
        ds.append_note("[second]");
        assert_eq!(ds.description.as_deref(), Some("[first] [second]"));
    }
}
