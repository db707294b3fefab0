use crate::models::Record;
use crate::services::memory::InMemoryRecordStore;
use crate::services::store::Entity;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading mock data
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture {path}: {reason}")]
    Invalid { path: String, reason: String },
}

pub const PROPERTIES_FILE: &str = "properties.json";
pub const SAVED_PROPERTIES_FILE: &str = "savedProperties.json";

/// `propertyType` -> `property_type`
fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Rewrite a camelCase fixture object into store field names
pub fn normalize_fixture(record: Record) -> Record {
    record
        .into_iter()
        .map(|(key, value)| {
            let key = match key.as_str() {
                "id" | "Id" => "Id".to_string(),
                _ => to_snake_case(&key),
            };
            (key, value)
        })
        .collect()
}

/// Parse a JSON array of fixture objects
pub fn parse_fixtures(json: &str, path: &str) -> Result<Vec<Record>, FixtureError> {
    let value: Value = serde_json::from_str(json).map_err(|e| FixtureError::Invalid {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(FixtureError::Invalid {
                path: path.to_string(),
                reason: "expected a JSON array".into(),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(normalize_fixture(record)),
            _ => Err(FixtureError::Invalid {
                path: path.to_string(),
                reason: format!("entry {} is not an object", i),
            }),
        })
        .collect()
}

async fn read_fixtures(path: &Path) -> Result<Vec<Record>, FixtureError> {
    let shown = path.display().to_string();
    match tokio::fs::read_to_string(path).await {
        Ok(json) => parse_fixtures(&json, &shown),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Fixture {} not found, starting empty", shown);
            Ok(Vec::new())
        }
        Err(source) => Err(FixtureError::Io { path: shown, source }),
    }
}

/// Build the mock-mode store from a fixture directory
pub async fn load_mock_store(dir: &Path, latency: Duration) -> Result<InMemoryRecordStore, FixtureError> {
    let properties = read_fixtures(&dir.join(PROPERTIES_FILE)).await?;
    let saved = read_fixtures(&dir.join(SAVED_PROPERTIES_FILE)).await?;

    tracing::info!(
        "Loaded {} properties and {} saved properties from {}",
        properties.len(),
        saved.len(),
        dir.display()
    );

    Ok(InMemoryRecordStore::with_listing_schema()
        .with_latency(latency)
        .with_records(Entity::Property, properties)
        .with_records(Entity::SavedProperty, saved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Property, SavedProperty};

    #[test]
    fn test_snake_case_keys() {
        assert_eq!(to_snake_case("propertyType"), "property_type");
        assert_eq!(to_snake_case("listingDate"), "listing_date");
        assert_eq!(to_snake_case("price"), "price");
    }

    #[test]
    fn test_parse_fixtures() {
        let json = r#"[
            {"id": "1", "address": "12 Oak St", "price": 300000, "propertyType": "House", "squareFeet": 1400},
            {"id": "2", "address": "5 Elm Ave", "price": 900000, "propertyType": "Condo"}
        ]"#;
        let records = parse_fixtures(json, "properties.json").unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].contains_key("Id"));
        assert!(records[0].contains_key("square_feet"));

        let property = Property::from_record(records[0].clone()).unwrap();
        assert_eq!(property.square_feet, Some(1400));
        assert_eq!(property.property_type, "House");
    }

    #[test]
    fn test_saved_fixture_round_trips_into_domain() {
        let json = r#"[{"id": "s1", "propertyId": "3", "savedDate": "2024-02-10T08:30:00Z", "notes": ""}]"#;
        let records = parse_fixtures(json, "savedProperties.json").unwrap();
        let saved = SavedProperty::from_record(records[0].clone()).unwrap();
        assert_eq!(saved.property_id.as_str(), "3");
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(parse_fixtures(r#"{"id": 1}"#, "x.json").is_err());
    }

    #[tokio::test]
    async fn test_missing_directory_yields_empty_store() {
        let store = load_mock_store(Path::new("/nonexistent/fixtures"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.len(Entity::Property).await, 0);
    }
}
