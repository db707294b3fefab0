// Criterion benchmarks for HomeScout

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use homescout::core::{filter_properties, join_saved, FilterEngine};
use homescout::models::{FilterCriteria, JoinOrder, Property, RecordId, SavedProperty};
use std::collections::HashMap;

const TYPES: [&str; 6] = ["House", "Apartment", "Condo", "Townhouse", "Villa", "Duplex"];
const STREETS: [&str; 5] = ["Oak St", "Elm Ave", "Maple Dr", "Harbor View Rd", "Pine Ct"];

fn create_property(id: usize) -> Property {
    Property {
        id: RecordId::from(id as u64),
        address: format!("{} {}, Portland, OR", 100 + id, STREETS[id % STREETS.len()]),
        description: if id % 3 == 0 {
            "Renovated kitchen with a large backyard".to_string()
        } else {
            "Close to parks and transit".to_string()
        },
        price: 150_000.0 + (id % 60) as f64 * 45_000.0,
        bedrooms: (id % 6) as u32,
        bathrooms: 1.0 + (id % 4) as f64 * 0.5,
        property_type: TYPES[id % TYPES.len()].to_string(),
        images: vec![format!("https://images.example.com/{}.jpg", id)],
        latitude: 45.5 + (id as f64 * 0.001) % 0.2,
        longitude: -122.6 - (id as f64 * 0.001) % 0.2,
        listing_date: None,
        square_feet: Some(800 + (id % 40) as u32 * 60),
        features: vec![],
        year_built: Some(1950 + (id % 70) as u16),
        lot_size: None,
    }
}

fn create_criteria() -> FilterCriteria {
    FilterCriteria {
        min_price: 250_000.0,
        max_price: 1_500_000.0,
        min_beds: 2,
        min_baths: 1.5,
        property_types: vec!["House".to_string(), "Condo".to_string(), "Townhouse".to_string()],
        location: "portland".to_string(),
        ..FilterCriteria::default()
    }
}

fn bench_filter(c: &mut Criterion) {
    let criteria = create_criteria();
    let mut group = c.benchmark_group("filter");

    for count in [10, 100, 1000, 10_000].iter() {
        let catalog: Vec<Property> = (0..*count).map(create_property).collect();

        group.bench_with_input(BenchmarkId::new("all_stages", count), count, |b, _| {
            b.iter(|| filter_properties(black_box(&catalog), black_box(&criteria), black_box("kitchen")));
        });
        group.bench_with_input(BenchmarkId::new("default_criteria", count), count, |b, _| {
            b.iter(|| {
                filter_properties(black_box(&catalog), black_box(&FilterCriteria::default()), black_box(""))
            });
        });
    }

    group.finish();
}

fn bench_featured(c: &mut Criterion) {
    let engine = FilterEngine::default();
    let catalog: Vec<Property> = (0..1000).map(create_property).collect();

    c.bench_function("featured_1000", |b| {
        b.iter(|| engine.featured(black_box(&catalog), None));
    });
}

fn bench_saved_join(c: &mut Criterion) {
    let catalog: Vec<Property> = (0..1000).map(create_property).collect();
    let saved: HashMap<RecordId, SavedProperty> = (0..1000)
        .step_by(7)
        .map(|i| {
            let property_id = RecordId::from(i as u64);
            let bookmark = SavedProperty {
                id: RecordId::from(10_000 + i as u64),
                property_id: property_id.clone(),
                saved_date: chrono::Utc::now(),
                notes: None,
            };
            (property_id, bookmark)
        })
        .collect();

    let mut group = c.benchmark_group("saved_join");
    group.bench_function("property_list_order", |b| {
        b.iter(|| join_saved(black_box(&catalog), black_box(&saved), JoinOrder::PropertyList));
    });
    group.bench_function("saved_date_order", |b| {
        b.iter(|| join_saved(black_box(&catalog), black_box(&saved), JoinOrder::SavedDate));
    });
    group.finish();
}

criterion_group!(benches, bench_filter, bench_featured, bench_saved_join);

criterion_main!(benches);
