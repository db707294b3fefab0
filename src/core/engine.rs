use crate::core::filters::{
    matches_location, matches_property_type, matches_search_term, meets_min_bathrooms, meets_min_bedrooms,
    within_price_range,
};
use crate::models::{FilterCriteria, Property};

/// Number of listings shown in the featured grid
pub const DEFAULT_FEATURED_LIMIT: usize = 6;

/// Client-side property filter - runs the fixed predicate pipeline
///
/// # Pipeline Stages
/// 1. Free-text search on address and description
/// 2. Price range (always applied)
/// 3. Minimum bedrooms
/// 4. Minimum bathrooms
/// 5. Property type
/// 6. Location substring on address
///
/// Every stage except price is skipped when its constraint is empty or zero.
/// Stages are AND-combined, so their order only affects cost.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    featured_limit: usize,
}

impl FilterEngine {
    pub fn new(featured_limit: usize) -> Self {
        Self { featured_limit }
    }

    /// Filter `properties` down to the ones satisfying all constraints
    ///
    /// The input is left untouched; survivors keep their relative order.
    pub fn filter(&self, properties: &[Property], criteria: &FilterCriteria, search_term: &str) -> Vec<Property> {
        filter_properties(properties, criteria, search_term)
    }

    /// Leading listings for the home page grid
    pub fn featured(&self, properties: &[Property], limit: Option<usize>) -> Vec<Property> {
        let limit = limit.unwrap_or(self.featured_limit);
        properties.iter().take(limit).cloned().collect()
    }

    pub fn featured_limit(&self) -> usize {
        self.featured_limit
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURED_LIMIT)
    }
}

/// Lowercases a text constraint, or `None` when it is blank
fn text_needle(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_lowercase())
    }
}

/// Stateless filter over a property list
pub fn filter_properties(properties: &[Property], criteria: &FilterCriteria, search_term: &str) -> Vec<Property> {
    let term = text_needle(search_term);
    let location = text_needle(&criteria.location);
    let min_beds = (criteria.min_beds > 0).then_some(criteria.min_beds);
    let min_baths = (criteria.min_baths > 0.0).then_some(criteria.min_baths);
    let property_types = (!criteria.property_types.is_empty()).then_some(criteria.property_types.as_slice());

    let filtered: Vec<Property> = properties
        .iter()
        // Stage 1: free-text search
        .filter(|p| term.as_deref().map_or(true, |t| matches_search_term(p, t)))
        // Stage 2: price range
        .filter(|p| within_price_range(p, criteria))
        // Stage 3 & 4: room counts
        .filter(|p| min_beds.map_or(true, |n| meets_min_bedrooms(p, n)))
        .filter(|p| min_baths.map_or(true, |n| meets_min_bathrooms(p, n)))
        // Stage 5: property type
        .filter(|p| property_types.map_or(true, |types| matches_property_type(p, types)))
        // Stage 6: location
        .filter(|p| location.as_deref().map_or(true, |l| matches_location(p, l)))
        .cloned()
        .collect();

    tracing::trace!(
        "Filtered {} properties down to {} (term: {:?})",
        properties.len(),
        filtered.len(),
        search_term
    );

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;

    fn create_property(id: u64, address: &str, price: f64, bedrooms: u32, property_type: &str) -> Property {
        Property {
            id: RecordId::from(id),
            address: address.to_string(),
            description: format!("Listing {}", id),
            price,
            bedrooms,
            bathrooms: 2.0,
            property_type: property_type.to_string(),
            images: vec![format!("https://img.test/{}.jpg", id)],
            latitude: 40.7128,
            longitude: -74.0060,
            listing_date: None,
            square_feet: Some(1500),
            features: vec![],
            year_built: None,
            lot_size: None,
        }
    }

    fn sample() -> Vec<Property> {
        vec![
            create_property(1, "12 Oak St", 300_000.0, 2, "House"),
            create_property(2, "5 Elm Ave", 900_000.0, 4, "Condo"),
            create_property(3, "77 Oakridge Blvd", 1_200_000.0, 5, "Villa"),
            create_property(4, "3 Harbor Way", 450_000.0, 3, "Condo"),
        ]
    }

    fn ids(properties: &[Property]) -> Vec<&str> {
        properties.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_default_criteria_keep_everything_in_range() {
        let engine = FilterEngine::default();
        let result = engine.filter(&sample(), &FilterCriteria::default(), "");
        assert_eq!(ids(&result), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_combined_constraints() {
        let engine = FilterEngine::default();
        let criteria = FilterCriteria {
            min_beds: 3,
            property_types: vec!["Condo".into()],
            max_price: 1_000_000.0,
            ..FilterCriteria::default()
        };

        let result = engine.filter(&sample(), &criteria, "");
        assert_eq!(ids(&result), vec!["2", "4"]);
    }

    #[test]
    fn test_blank_search_term_is_skipped() {
        let engine = FilterEngine::default();
        let result = engine.filter(&sample(), &FilterCriteria::default(), "   ");
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_search_and_location_together() {
        let engine = FilterEngine::default();
        let criteria = FilterCriteria {
            location: "OAK".into(),
            ..FilterCriteria::default()
        };

        let result = engine.filter(&sample(), &criteria, "listing 3");
        assert_eq!(ids(&result), vec!["3"]);
    }

    #[test]
    fn test_inverted_price_bounds_not_swapped() {
        let engine = FilterEngine::default();
        let criteria = FilterCriteria {
            min_price: 1_000_000.0,
            max_price: 100_000.0,
            ..FilterCriteria::default()
        };

        assert!(engine.filter(&sample(), &criteria, "").is_empty());
    }

    #[test]
    fn test_radius_is_ignored() {
        let engine = FilterEngine::default();
        let criteria = FilterCriteria {
            radius: 0.0,
            ..FilterCriteria::default()
        };

        assert_eq!(engine.filter(&sample(), &criteria, "").len(), 4);
    }

    #[test]
    fn test_input_not_mutated() {
        let engine = FilterEngine::default();
        let properties = sample();
        let before = properties.clone();
        let criteria = FilterCriteria {
            min_beds: 5,
            ..FilterCriteria::default()
        };

        let _ = engine.filter(&properties, &criteria, "oak");
        assert_eq!(properties, before);
    }

    #[test]
    fn test_featured_takes_leading_listings() {
        let engine = FilterEngine::new(2);
        assert_eq!(ids(&engine.featured(&sample(), None)), vec!["1", "2"]);
        assert_eq!(ids(&engine.featured(&sample(), Some(10))).len(), 4);
    }
}
