use crate::models::criteria::FilterCriteria;
use crate::models::domain::JoinOrder;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string for the property search endpoint
///
/// Absent parameters fall back to the default criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchPropertiesRequest {
    #[serde(default)]
    pub q: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub min_price: Option<f64>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_beds: Option<u32>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub min_baths: Option<f64>,
    /// Comma separated property types, e.g. `House,Condo`
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub radius: Option<f64>,
}

impl SearchPropertiesRequest {
    pub fn search_term(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }

    pub fn to_criteria(&self) -> FilterCriteria {
        let defaults = FilterCriteria::default();
        FilterCriteria {
            min_price: self.min_price.unwrap_or(defaults.min_price),
            max_price: self.max_price.unwrap_or(defaults.max_price),
            min_beds: self.min_beds.unwrap_or(defaults.min_beds),
            min_baths: self.min_baths.unwrap_or(defaults.min_baths),
            property_types: self
                .types
                .as_deref()
                .map(|types| {
                    types
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            radius: self.radius.unwrap_or(defaults.radius),
        }
    }
}

/// Query string for the featured listings endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeaturedRequest {
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

/// Query string for the saved properties view
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedListRequest {
    #[serde(default)]
    pub order: Option<JoinOrder>,
}

/// Request to bookmark a property
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SavePropertyRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "property_id", rename = "propertyId")]
    pub property_id: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to remove several bookmarks at once
///
/// Without `propertyIds` every saved property is removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearSavedRequest {
    #[serde(alias = "property_ids", rename = "propertyIds", default)]
    pub property_ids: Option<Vec<String>>,
}
