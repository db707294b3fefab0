use crate::models::{Record, RecordId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised by a record store adapter before a response is available
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Entities held by the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Property,
    SavedProperty,
}

impl Entity {
    pub fn name(&self) -> &'static str {
        match self {
            Entity::Property => "property",
            Entity::SavedProperty => "saved_property",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality condition on a record field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query for `fetch_records`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub conditions: Vec<Condition>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep records whose `field` equals one of `values`
    pub fn equal_to(mut self, field: &str, values: Vec<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            values,
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Field-level rejection reported by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_label: String,
    pub message: String,
}

/// Result of `fetch_records`
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub success: bool,
    pub data: Vec<Record>,
    pub message: Option<String>,
}

/// Result of `get_record_by_id`
#[derive(Debug, Clone, Default)]
pub struct RecordResponse {
    pub success: bool,
    pub data: Option<Record>,
    pub message: Option<String>,
}

/// Outcome for one record of a batch call
#[derive(Debug, Clone, Default)]
pub struct RecordResult {
    pub success: bool,
    pub data: Option<Record>,
    pub errors: Vec<FieldError>,
    pub message: Option<String>,
    /// HTTP-style status for failures (400, 404, 409, ...)
    pub status: Option<u16>,
}

impl RecordResult {
    pub fn ok(data: Option<Record>) -> Self {
        Self {
            success: true,
            data,
            ..Default::default()
        }
    }

    pub fn failed(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }
}

/// Result of `create_records`, `update_records` and `delete_records`
///
/// `results` is positionally aligned with the request.
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<RecordResult>,
    pub message: Option<String>,
}

impl BatchResponse {
    pub fn from_results(results: Vec<RecordResult>) -> Self {
        Self {
            success: results.iter().all(|r| r.success),
            results,
            message: None,
        }
    }
}

/// Contract of the hosted record store
///
/// A `success: false` response is a store-side rejection; `Err` means the
/// store could not be reached or answered with something unreadable.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_records(&self, entity: Entity, query: &RecordQuery) -> Result<FetchResponse, StoreError>;

    async fn get_record_by_id(&self, entity: Entity, id: &RecordId) -> Result<RecordResponse, StoreError>;

    async fn create_records(&self, entity: Entity, records: Vec<Record>) -> Result<BatchResponse, StoreError>;

    /// Each record must carry its `Id`
    async fn update_records(&self, entity: Entity, records: Vec<Record>) -> Result<BatchResponse, StoreError>;

    async fn delete_records(&self, entity: Entity, ids: &[RecordId]) -> Result<BatchResponse, StoreError>;

    /// Adapter name for health reporting
    fn backend_name(&self) -> &'static str;
}

/// Record id stored under `Id` (falls back to `id`)
pub fn record_id(record: &Record) -> Option<RecordId> {
    record
        .get("Id")
        .or_else(|| record.get("id"))
        .and_then(RecordId::from_value)
}
