use crate::core::format::format_price_compact;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_PRICE: f64 = 0.0;
pub const DEFAULT_MAX_PRICE: f64 = 2_000_000.0;
pub const DEFAULT_RADIUS: f64 = 10.0;

/// Property types offered by the search form
pub const PROPERTY_TYPES: [&str; 6] = ["House", "Apartment", "Condo", "Townhouse", "Villa", "Duplex"];

/// User-chosen constraints narrowing a property list
///
/// Zero and empty values mean "no constraint" for every field except the
/// price bounds, which always apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub min_price: f64,
    pub max_price: f64,
    pub min_beds: u32,
    pub min_baths: f64,
    pub property_types: Vec<String>,
    pub location: String,
    /// Carried for the search form; not applied when filtering
    pub radius: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
            min_beds: 0,
            min_baths: 0.0,
            property_types: Vec::new(),
            location: String::new(),
            radius: DEFAULT_RADIUS,
        }
    }
}

/// Identifies one removable constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FilterKey {
    PropertyType(String),
    MinBeds,
    MinBaths,
    Location,
    MinPrice,
    MaxPrice,
}

/// A constraint currently narrowing the list, with its display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveFilter {
    pub key: FilterKey,
    pub label: String,
}

impl FilterCriteria {
    /// Select the type if absent, deselect it if present
    pub fn toggle_property_type(&mut self, property_type: &str) {
        if let Some(pos) = self.property_types.iter().position(|t| t == property_type) {
            self.property_types.remove(pos);
        } else {
            self.property_types.push(property_type.to_string());
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_active_filters(&self) -> bool {
        !self.property_types.is_empty()
            || self.min_beds > 0
            || self.min_baths > 0.0
            || !self.location.trim().is_empty()
            || self.min_price > DEFAULT_MIN_PRICE
            || self.max_price < DEFAULT_MAX_PRICE
    }

    /// Tags for every active constraint, in form order
    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        let mut tags: Vec<ActiveFilter> = self
            .property_types
            .iter()
            .map(|t| ActiveFilter {
                key: FilterKey::PropertyType(t.clone()),
                label: t.clone(),
            })
            .collect();

        if self.min_beds > 0 {
            tags.push(ActiveFilter {
                key: FilterKey::MinBeds,
                label: format!("{}+ beds", self.min_beds),
            });
        }
        if self.min_baths > 0.0 {
            tags.push(ActiveFilter {
                key: FilterKey::MinBaths,
                label: format!("{}+ baths", self.min_baths),
            });
        }
        if !self.location.trim().is_empty() {
            tags.push(ActiveFilter {
                key: FilterKey::Location,
                label: self.location.clone(),
            });
        }
        if self.min_price > DEFAULT_MIN_PRICE {
            tags.push(ActiveFilter {
                key: FilterKey::MinPrice,
                label: format!("Min Price: {}", format_price_compact(self.min_price)),
            });
        }
        if self.max_price < DEFAULT_MAX_PRICE {
            tags.push(ActiveFilter {
                key: FilterKey::MaxPrice,
                label: format!("Max Price: {}", format_price_compact(self.max_price)),
            });
        }

        tags
    }

    /// Reset a single constraint back to its default
    pub fn clear_filter(&mut self, key: &FilterKey) {
        match key {
            FilterKey::PropertyType(t) => self.property_types.retain(|selected| selected != t),
            FilterKey::MinBeds => self.min_beds = 0,
            FilterKey::MinBaths => self.min_baths = 0.0,
            FilterKey::Location => self.location.clear(),
            FilterKey::MinPrice => self.min_price = DEFAULT_MIN_PRICE,
            FilterKey::MaxPrice => self.max_price = DEFAULT_MAX_PRICE,
        }
    }
}
