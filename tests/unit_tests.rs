// Unit tests for the HomeScout filter engine and criteria helpers

use homescout::core::{filter_properties, format_price, format_price_compact, FilterEngine};
use homescout::models::{FilterCriteria, FilterKey, Property, RecordId};

fn create_test_property(id: u64, address: &str, price: f64, bedrooms: u32) -> Property {
    Property {
        id: RecordId::from(id),
        address: address.to_string(),
        description: String::new(),
        price,
        bedrooms,
        bathrooms: 1.0,
        property_type: "House".to_string(),
        images: vec![],
        latitude: 0.0,
        longitude: 0.0,
        listing_date: None,
        square_feet: None,
        features: vec![],
        year_built: None,
        lot_size: None,
    }
}

fn two_listings() -> Vec<Property> {
    vec![
        create_test_property(1, "12 Oak St", 300_000.0, 2),
        create_test_property(2, "5 Elm Ave", 900_000.0, 4),
    ]
}

fn mixed_catalog() -> Vec<Property> {
    let mut catalog = Vec::new();
    let types = ["House", "Condo", "Apartment", "Villa", "Townhouse"];
    for i in 0..40u64 {
        let mut p = create_test_property(
            i + 1,
            &format!("{} {} Street", 100 + i, if i % 3 == 0 { "Oak" } else { "Cedar" }),
            150_000.0 + (i as f64) * 75_000.0,
            (i % 5) as u32 + 1,
        );
        p.bathrooms = 1.0 + (i % 4) as f64 * 0.5;
        p.property_type = types[(i % 5) as usize].to_string();
        p.description = if i % 4 == 0 { "Garden and pool".into() } else { "Close to transit".into() };
        catalog.push(p);
    }
    catalog
}

fn ids(properties: &[Property]) -> Vec<&str> {
    properties.iter().map(|p| p.id.as_str()).collect()
}

#[test]
fn test_min_beds_example() {
    let criteria = FilterCriteria {
        min_beds: 3,
        ..FilterCriteria::default()
    };
    let result = filter_properties(&two_listings(), &criteria, "");
    assert_eq!(ids(&result), vec!["2"]);
}

#[test]
fn test_search_term_is_case_insensitive() {
    let result = filter_properties(&two_listings(), &FilterCriteria::default(), "oak");
    assert_eq!(ids(&result), vec!["1"]);

    let result = filter_properties(&two_listings(), &FilterCriteria::default(), "ELM");
    assert_eq!(ids(&result), vec!["2"]);
}

#[test]
fn test_unbounded_price_never_excludes() {
    let mut catalog = mixed_catalog();
    catalog.push(create_test_property(99, "1 Palace Rd", 45_000_000.0, 9));
    let criteria = FilterCriteria {
        min_price: 0.0,
        max_price: f64::INFINITY,
        ..FilterCriteria::default()
    };

    let result = filter_properties(&catalog, &criteria, "");
    assert_eq!(result.len(), catalog.len());
}

#[test]
fn test_empty_search_term_is_no_op() {
    let catalog = mixed_catalog();
    let criteria = FilterCriteria {
        min_beds: 2,
        property_types: vec!["Condo".into(), "House".into()],
        ..FilterCriteria::default()
    };

    let blank = filter_properties(&catalog, &criteria, "");
    let spaces = filter_properties(&catalog, &criteria, "   ");
    let expected: Vec<&Property> = catalog
        .iter()
        .filter(|p| p.bedrooms >= 2 && (p.property_type == "Condo" || p.property_type == "House"))
        .filter(|p| p.price <= criteria.max_price)
        .collect();

    assert_eq!(blank.len(), expected.len());
    assert_eq!(blank, spaces);
}

#[test]
fn test_filter_is_idempotent() {
    let catalog = mixed_catalog();
    let criteria = FilterCriteria {
        min_price: 400_000.0,
        max_price: 1_800_000.0,
        min_baths: 1.5,
        location: "street".into(),
        ..FilterCriteria::default()
    };

    let once = filter_properties(&catalog, &criteria, "oak");
    let twice = filter_properties(&once, &criteria, "oak");
    assert!(!once.is_empty());
    assert_eq!(once, twice);
}

#[test]
fn test_filter_preserves_input_order() {
    let mut catalog = mixed_catalog();
    catalog.reverse();
    let criteria = FilterCriteria {
        min_beds: 3,
        ..FilterCriteria::default()
    };

    let result = filter_properties(&catalog, &criteria, "");
    let positions: Vec<usize> = result
        .iter()
        .map(|p| catalog.iter().position(|c| c.id == p.id).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_filter_leaves_input_untouched() {
    let catalog = mixed_catalog();
    let before = catalog.clone();
    let criteria = FilterCriteria {
        property_types: vec!["Villa".into()],
        ..FilterCriteria::default()
    };

    let _ = filter_properties(&catalog, &criteria, "pool");
    assert_eq!(catalog, before);
}

#[test]
fn test_radius_does_not_filter() {
    let catalog = mixed_catalog();
    let near = FilterCriteria {
        radius: 0.5,
        ..FilterCriteria::default()
    };
    let far = FilterCriteria {
        radius: 500.0,
        ..FilterCriteria::default()
    };

    assert_eq!(filter_properties(&catalog, &near, ""), filter_properties(&catalog, &far, ""));
}

#[test]
fn test_featured_takes_leading_listings() {
    let engine = FilterEngine::default();
    let catalog = mixed_catalog();

    let featured = engine.featured(&catalog, None);
    assert_eq!(ids(&featured), vec!["1", "2", "3", "4", "5", "6"]);
    assert_eq!(engine.featured(&catalog, Some(2)).len(), 2);
    assert_eq!(engine.featured(&catalog[..3], None).len(), 3);
}

#[test]
fn test_active_filter_tags_round_trip_through_clear() {
    let mut criteria = FilterCriteria::default();
    criteria.toggle_property_type("Condo");
    criteria.min_beds = 2;
    criteria.max_price = 750_000.0;
    assert!(criteria.has_active_filters());

    for tag in criteria.active_filters() {
        criteria.clear_filter(&tag.key);
    }
    assert!(!criteria.has_active_filters());
    assert_eq!(criteria, FilterCriteria::default());
}

#[test]
fn test_clearing_one_type_keeps_others() {
    let mut criteria = FilterCriteria::default();
    criteria.toggle_property_type("House");
    criteria.toggle_property_type("Villa");

    criteria.clear_filter(&FilterKey::PropertyType("House".into()));
    assert_eq!(criteria.property_types, vec!["Villa"]);
}

#[test]
fn test_price_formatting() {
    assert_eq!(format_price_compact(4_760_000.0), "$4.8M");
    assert_eq!(format_price_compact(625_000.0), "$625K");
    assert_eq!(format_price_compact(950.0), "$950");
    assert_eq!(format_price(1_150_000.0), "$1,150,000");
}
