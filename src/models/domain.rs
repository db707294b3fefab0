use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A raw record as exchanged with the record store
pub type Record = Map<String, Value>;

/// Store-assigned record identifier
///
/// The hosted store hands out integer ids while the mock fixtures use
/// strings, so both are accepted on input and normalised to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON form used when writing the id back into a record
    pub fn to_value(&self) -> Value {
        match self.0.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(self.0.clone()),
        }
    }

    /// Reads an id out of a scalar or lookup-shaped JSON value
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Object(obj) => obj
                .get("Id")
                .or_else(|| obj.get("id"))
                .and_then(Self::from_value),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid record id: {}", value)))
    }
}

/// Treats an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts either a JSON array or a comma/newline separated string
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(items)) => items,
        Some(Raw::Text(text)) => text
            .split(|c| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    })
}

/// A real-estate listing
///
/// Field aliases cover the store's snake_case column names, so the same type
/// reads both store records and camelCase API payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(alias = "Id", alias = "$id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bedrooms: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bathrooms: f64,
    #[serde(alias = "property_type", default, deserialize_with = "null_as_default")]
    pub property_type: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub longitude: f64,
    #[serde(alias = "listing_date", default)]
    pub listing_date: Option<DateTime<Utc>>,
    #[serde(alias = "square_feet", default)]
    pub square_feet: Option<u32>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub features: Vec<String>,
    #[serde(alias = "year_built", default)]
    pub year_built: Option<u16>,
    #[serde(alias = "lot_size", default)]
    pub lot_size: Option<f64>,
}

impl Property {
    /// Parse a property out of a store record
    pub fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}

/// Fields for a property that does not exist in the store yet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub address: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: f64,
    pub property_type: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub year_built: Option<u16>,
    #[serde(default)]
    pub lot_size: Option<f64>,
}

impl NewProperty {
    /// Build the store record, stamping the listing date
    pub fn to_record(&self, listing_date: DateTime<Utc>) -> Record {
        let mut record = Record::new();
        record.insert("address".into(), Value::from(self.address.clone()));
        record.insert("description".into(), Value::from(self.description.clone()));
        record.insert("price".into(), Value::from(self.price));
        record.insert("bedrooms".into(), Value::from(self.bedrooms));
        record.insert("bathrooms".into(), Value::from(self.bathrooms));
        record.insert("property_type".into(), Value::from(self.property_type.clone()));
        record.insert("images".into(), Value::from(self.images.clone()));
        record.insert("latitude".into(), Value::from(self.latitude));
        record.insert("longitude".into(), Value::from(self.longitude));
        record.insert("features".into(), Value::from(self.features.clone()));
        record.insert("listing_date".into(), Value::from(listing_date.to_rfc3339()));
        if let Some(square_feet) = self.square_feet {
            record.insert("square_feet".into(), Value::from(square_feet));
        }
        if let Some(year_built) = self.year_built {
            record.insert("year_built".into(), Value::from(year_built));
        }
        if let Some(lot_size) = self.lot_size {
            record.insert("lot_size".into(), Value::from(lot_size));
        }
        record
    }
}

/// Partial update for a property; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPatch {
    pub address: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub property_type: Option<String>,
    pub images: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
}

impl PropertyPatch {
    pub fn to_record(&self, id: &RecordId) -> Record {
        let mut record = Record::new();
        record.insert("Id".into(), id.to_value());
        if let Some(address) = &self.address {
            record.insert("address".into(), Value::from(address.clone()));
        }
        if let Some(description) = &self.description {
            record.insert("description".into(), Value::from(description.clone()));
        }
        if let Some(price) = self.price {
            record.insert("price".into(), Value::from(price));
        }
        if let Some(bedrooms) = self.bedrooms {
            record.insert("bedrooms".into(), Value::from(bedrooms));
        }
        if let Some(bathrooms) = self.bathrooms {
            record.insert("bathrooms".into(), Value::from(bathrooms));
        }
        if let Some(property_type) = &self.property_type {
            record.insert("property_type".into(), Value::from(property_type.clone()));
        }
        if let Some(images) = &self.images {
            record.insert("images".into(), Value::from(images.clone()));
        }
        if let Some(features) = &self.features {
            record.insert("features".into(), Value::from(features.clone()));
        }
        record
    }
}

/// Bookmark joining the current user to a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProperty {
    #[serde(alias = "Id", alias = "$id")]
    pub id: RecordId,
    #[serde(alias = "property_id")]
    pub property_id: RecordId,
    #[serde(alias = "saved_date", default = "Utc::now")]
    pub saved_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SavedProperty {
    pub fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}

/// Fields for a bookmark that is about to be created
#[derive(Debug, Clone)]
pub struct NewSavedProperty {
    pub property_id: RecordId,
    pub notes: Option<String>,
}

impl NewSavedProperty {
    pub fn new(property_id: RecordId) -> Self {
        Self { property_id, notes: None }
    }

    pub fn to_record(&self, saved_date: DateTime<Utc>) -> Record {
        let mut record = Record::new();
        record.insert("property_id".into(), self.property_id.to_value());
        record.insert("saved_date".into(), Value::from(saved_date.to_rfc3339()));
        if let Some(notes) = &self.notes {
            record.insert("notes".into(), Value::from(notes.clone()));
        }
        record
    }
}

/// Ordering of the saved-properties view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinOrder {
    /// Order of the property list the join is taken against
    #[default]
    PropertyList,
    /// Oldest save first
    SavedDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_accepts_numbers_and_strings() {
        let a: RecordId = serde_json::from_value(json!(7)).unwrap();
        let b: RecordId = serde_json::from_value(json!("7")).unwrap();
        let c: RecordId = serde_json::from_value(json!({"Id": 7, "Name": "12 Oak St"})).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_value(), json!(7));
        assert_eq!(RecordId::from("p-1").to_value(), json!("p-1"));
    }

    #[test]
    fn test_property_from_store_record() {
        let record = json!({
            "Id": 3,
            "address": "12 Oak St",
            "description": null,
            "price": 300000,
            "bedrooms": 2,
            "bathrooms": 1.5,
            "property_type": "House",
            "images": "a.jpg, b.jpg",
            "listing_date": "2024-03-01T00:00:00Z",
            "square_feet": 1200
        });
        let property = Property::from_record(record.as_object().unwrap().clone()).unwrap();

        assert_eq!(property.id, RecordId::from(3));
        assert_eq!(property.description, "");
        assert_eq!(property.property_type, "House");
        assert_eq!(property.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(property.square_feet, Some(1200));
        assert!(property.features.is_empty());
    }

    #[test]
    fn test_property_from_api_payload() {
        let property: Property = serde_json::from_value(json!({
            "id": "p1",
            "address": "5 Elm Ave",
            "price": 900000,
            "propertyType": "Condo",
            "images": ["x.jpg"]
        }))
        .unwrap();

        assert_eq!(property.property_type, "Condo");
        assert_eq!(property.bedrooms, 0);
        assert!(property.listing_date.is_none());
    }

    #[test]
    fn test_saved_property_record_shape() {
        let new = NewSavedProperty {
            property_id: RecordId::from(7),
            notes: Some("corner lot".into()),
        };
        let record = new.to_record(Utc::now());
        assert_eq!(record["property_id"], json!(7));
        assert_eq!(record["notes"], json!("corner lot"));

        let mut stored = record.clone();
        stored.insert("Id".into(), json!(1));
        let saved = SavedProperty::from_record(stored).unwrap();
        assert_eq!(saved.property_id, RecordId::from(7));
        assert_eq!(saved.id, RecordId::from(1));
    }
}
