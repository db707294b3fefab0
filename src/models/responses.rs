use crate::models::criteria::ActiveFilter;
use crate::models::domain::{Property, RecordId};
use serde::{Deserialize, Serialize};

/// Response for the property search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListResponse {
    pub properties: Vec<Property>,
    pub total: usize,
    pub active_filters: Vec<ActiveFilter>,
    /// Set when the list was served from the previous catalog
    pub notice: Option<String>,
}

/// Single property with its saved flag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetailResponse {
    #[serde(flatten)]
    pub property: Property,
    /// Full price label, e.g. `$1,150,000`
    pub display_price: String,
    pub is_saved: bool,
}

/// Response for the saved properties view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPropertiesResponse {
    pub properties: Vec<Property>,
    pub saved_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearFailure {
    pub property_id: RecordId,
    pub message: String,
}

/// Aggregate outcome of a clear-all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearAllResponse {
    pub removed: Vec<RecordId>,
    pub failed: Vec<ClearFailure>,
    pub complete: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
