use crate::models::{FilterCriteria, Property};

/// Case-insensitive substring test; `needle` must already be lowercase
#[inline]
fn contains_lowercase(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Free-text pass: address or description contains the term
///
/// `term` is expected lowercase. Missing text is treated as empty.
#[inline]
pub fn matches_search_term(property: &Property, term: &str) -> bool {
    contains_lowercase(&property.address, term) || contains_lowercase(&property.description, term)
}

/// Price pass, inclusive on both ends
///
/// Inverted bounds are honoured as given and match nothing.
#[inline]
pub fn within_price_range(property: &Property, criteria: &FilterCriteria) -> bool {
    property.price >= criteria.min_price && property.price <= criteria.max_price
}

#[inline]
pub fn meets_min_bedrooms(property: &Property, min_beds: u32) -> bool {
    property.bedrooms >= min_beds
}

#[inline]
pub fn meets_min_bathrooms(property: &Property, min_baths: f64) -> bool {
    property.bathrooms >= min_baths
}

/// Exact match against the selected types
#[inline]
pub fn matches_property_type(property: &Property, property_types: &[String]) -> bool {
    property_types.iter().any(|t| *t == property.property_type)
}

/// Location pass; `location` is expected lowercase
#[inline]
pub fn matches_location(property: &Property, location: &str) -> bool {
    contains_lowercase(&property.address, location)
}
