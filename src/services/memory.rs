use crate::models::{Record, RecordId};
use crate::services::store::{
    record_id, BatchResponse, Entity, FetchResponse, FieldError, RecordQuery, RecordResponse, RecordResult,
    RecordStore, SortDirection, StoreError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Table {
    records: Vec<Record>,
    next_id: u64,
}

impl Table {
    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| record_id(r).as_ref() == Some(id))
    }
}

/// Record store kept in process memory
///
/// Backs mock mode and the test suite. Tables keep insertion order, ids are
/// assigned from a per-entity counter, and unique fields are enforced the way
/// the hosted store enforces them (409 on conflict). Latency and per-record
/// failures can be injected.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<Entity, Table>>,
    unique_fields: HashMap<Entity, Vec<String>>,
    required_fields: HashMap<Entity, Vec<String>>,
    latency: Duration,
    failing: RwLock<HashSet<(Entity, RecordId)>>,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the constraints of the listing schema
    pub fn with_listing_schema() -> Self {
        Self::new()
            .with_unique(Entity::SavedProperty, "property_id")
            .with_required(Entity::SavedProperty, "property_id")
            .with_required(Entity::Property, "address")
            .with_required(Entity::Property, "price")
    }

    /// Sleep this long before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_unique(mut self, entity: Entity, field: &str) -> Self {
        self.unique_fields.entry(entity).or_default().push(field.to_string());
        self
    }

    pub fn with_required(mut self, entity: Entity, field: &str) -> Self {
        self.required_fields.entry(entity).or_default().push(field.to_string());
        self
    }

    /// Preload records; ids already present are kept
    pub fn with_records(mut self, entity: Entity, records: Vec<Record>) -> Self {
        let table = self.tables.get_mut().entry(entity).or_default();
        for mut record in records {
            match record_id(&record) {
                Some(id) => {
                    if let Ok(n) = id.as_str().parse::<u64>() {
                        table.next_id = table.next_id.max(n);
                    }
                    record.remove("id");
                    record.insert("Id".into(), id.to_value());
                }
                None => {
                    table.next_id += 1;
                    record.insert("Id".into(), Value::from(table.next_id));
                }
            }
            table.records.push(record);
        }
        self
    }

    /// Make every later update or delete of this record fail
    pub async fn fail_record(&self, entity: Entity, id: RecordId) {
        self.failing.write().await.insert((entity, id));
    }

    /// Simulate an outage; every call errors until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    pub async fn len(&self, entity: Entity) -> usize {
        self.tables.read().await.get(&entity).map_or(0, |t| t.records.len())
    }

    async fn enter(&self) -> Result<(), StoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::ApiError("record store unavailable".into()));
        }
        Ok(())
    }

    async fn is_failing(&self, entity: Entity, id: &RecordId) -> bool {
        self.failing.read().await.contains(&(entity, id.clone()))
    }

    fn missing_fields(&self, entity: Entity, record: &Record) -> Vec<FieldError> {
        self.required_fields
            .get(&entity)
            .into_iter()
            .flatten()
            .filter(|field| record.get(field.as_str()).map_or(true, Value::is_null))
            .map(|field| FieldError {
                field_label: field.clone(),
                message: format!("{} is required", field),
            })
            .collect()
    }

    fn conflicting_field(&self, entity: Entity, table: &Table, record: &Record, skip: Option<&RecordId>) -> Option<String> {
        let fields = self.unique_fields.get(&entity)?;
        fields
            .iter()
            .find(|field| {
                let Some(value) = record.get(field.as_str()) else {
                    return false;
                };
                table.records.iter().any(|existing| {
                    skip.map_or(true, |id| record_id(existing).as_ref() != Some(id))
                        && existing.get(field.as_str()).is_some_and(|v| values_match(v, value))
                })
            })
            .cloned()
    }
}

/// Field equality that treats `7` and `"7"` as the same id
fn values_match(a: &Value, b: &Value) -> bool {
    match (RecordId::from_value(a), RecordId::from_value(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_records(&self, entity: Entity, query: &RecordQuery) -> Result<FetchResponse, StoreError> {
        self.enter().await?;
        let tables = self.tables.read().await;
        let mut data: Vec<Record> = tables
            .get(&entity)
            .map(|t| t.records.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|record| {
                query.conditions.iter().all(|condition| {
                    record
                        .get(&condition.field)
                        .is_some_and(|v| condition.values.iter().any(|wanted| values_match(v, wanted)))
                })
            })
            .cloned()
            .collect();
        drop(tables);

        if let Some(order) = &query.order_by {
            // stable sort keeps insertion order among equal keys
            data.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let data = data
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(FetchResponse {
            success: true,
            data,
            message: None,
        })
    }

    async fn get_record_by_id(&self, entity: Entity, id: &RecordId) -> Result<RecordResponse, StoreError> {
        self.enter().await?;
        let tables = self.tables.read().await;
        let found = tables
            .get(&entity)
            .and_then(|t| t.position(id).map(|pos| t.records[pos].clone()));

        Ok(match found {
            Some(record) => RecordResponse {
                success: true,
                data: Some(record),
                message: None,
            },
            None => RecordResponse {
                success: false,
                data: None,
                message: Some(format!("Record {} not found in {}", id, entity)),
            },
        })
    }

    async fn create_records(&self, entity: Entity, records: Vec<Record>) -> Result<BatchResponse, StoreError> {
        self.enter().await?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(entity).or_default();
        let mut results = Vec::with_capacity(records.len());

        for mut record in records {
            let missing = self.missing_fields(entity, &record);
            if !missing.is_empty() {
                results.push(RecordResult::failed(400, "Validation failed").with_errors(missing));
                continue;
            }
            if let Some(field) = self.conflicting_field(entity, table, &record, None) {
                results.push(
                    RecordResult::failed(409, format!("Duplicate value for {}", field)).with_errors(vec![FieldError {
                        field_label: field.clone(),
                        message: "must be unique".into(),
                    }]),
                );
                continue;
            }

            table.next_id += 1;
            record.insert("Id".into(), Value::from(table.next_id));
            record.insert("CreatedOn".into(), Value::from(chrono::Utc::now().to_rfc3339()));
            table.records.push(record.clone());
            results.push(RecordResult::ok(Some(record)));
        }

        Ok(BatchResponse::from_results(results))
    }

    async fn update_records(&self, entity: Entity, records: Vec<Record>) -> Result<BatchResponse, StoreError> {
        self.enter().await?;
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let Some(id) = record_id(&record) else {
                results.push(RecordResult::failed(400, "Record is missing Id"));
                continue;
            };
            if self.is_failing(entity, &id).await {
                results.push(RecordResult::failed(500, format!("Failed to update record {}", id)));
                continue;
            }

            let mut tables = self.tables.write().await;
            let table = tables.entry(entity).or_default();
            let Some(pos) = table.position(&id) else {
                results.push(RecordResult::failed(404, format!("Record {} not found in {}", id, entity)));
                continue;
            };
            if let Some(field) = self.conflicting_field(entity, table, &record, Some(&id)) {
                results.push(RecordResult::failed(409, format!("Duplicate value for {}", field)));
                continue;
            }

            let existing = &mut table.records[pos];
            for (key, value) in record {
                existing.insert(key, value);
            }
            existing.insert("ModifiedOn".into(), Value::from(chrono::Utc::now().to_rfc3339()));
            results.push(RecordResult::ok(Some(existing.clone())));
        }

        Ok(BatchResponse::from_results(results))
    }

    async fn delete_records(&self, entity: Entity, ids: &[RecordId]) -> Result<BatchResponse, StoreError> {
        self.enter().await?;
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            if self.is_failing(entity, id).await {
                results.push(RecordResult::failed(500, format!("Failed to delete record {}", id)));
                continue;
            }

            let mut tables = self.tables.write().await;
            let table = tables.entry(entity).or_default();
            match table.position(id) {
                Some(pos) => {
                    table.records.remove(pos);
                    results.push(RecordResult::ok(None));
                }
                None => results.push(RecordResult::failed(404, format!("Record {} not found in {}", id, entity))),
            }
        }

        Ok(BatchResponse::from_results(results))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryRecordStore::new().with_records(
            Entity::Property,
            vec![record(json!({"id": "4", "address": "a", "price": 1}))],
        );

        let batch = store
            .create_records(Entity::Property, vec![record(json!({"address": "b", "price": 2}))])
            .await
            .unwrap();

        assert!(batch.success);
        let created = batch.results[0].data.as_ref().unwrap();
        assert_eq!(record_id(created), Some(RecordId::from(5)));
        assert_eq!(store.len(Entity::Property).await, 2);
    }

    #[tokio::test]
    async fn test_unique_field_conflict() {
        let store = InMemoryRecordStore::with_listing_schema();
        let first = store
            .create_records(Entity::SavedProperty, vec![record(json!({"property_id": 7}))])
            .await
            .unwrap();
        let second = store
            .create_records(Entity::SavedProperty, vec![record(json!({"property_id": "7"}))])
            .await
            .unwrap();

        assert!(first.success);
        assert!(!second.success);
        assert_eq!(second.results[0].status, Some(409));
    }

    #[tokio::test]
    async fn test_required_fields() {
        let store = InMemoryRecordStore::with_listing_schema();
        let batch = store
            .create_records(Entity::Property, vec![record(json!({"address": "1 Main St"}))])
            .await
            .unwrap();

        assert_eq!(batch.results[0].status, Some(400));
        assert_eq!(batch.results[0].errors[0].field_label, "price");
    }

    #[tokio::test]
    async fn test_fetch_with_conditions_and_order() {
        let store = InMemoryRecordStore::new().with_records(
            Entity::Property,
            vec![
                record(json!({"address": "a", "price": 3, "property_type": "House"})),
                record(json!({"address": "b", "price": 1, "property_type": "Condo"})),
                record(json!({"address": "c", "price": 2, "property_type": "House"})),
            ],
        );

        let query = RecordQuery::new()
            .equal_to("property_type", vec![json!("House")])
            .order_by("price", SortDirection::Ascending);
        let fetched = store.fetch_records(Entity::Property, &query).await.unwrap();

        let addresses: Vec<&str> = fetched.data.iter().map(|r| r["address"].as_str().unwrap()).collect();
        assert_eq!(addresses, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_injected_delete_failure_is_per_record() {
        let store = InMemoryRecordStore::new().with_records(
            Entity::SavedProperty,
            vec![
                record(json!({"property_id": 1})),
                record(json!({"property_id": 2})),
                record(json!({"property_id": 3})),
            ],
        );
        store.fail_record(Entity::SavedProperty, RecordId::from(2)).await;

        let ids = [RecordId::from(1), RecordId::from(2), RecordId::from(3)];
        let batch = store.delete_records(Entity::SavedProperty, &ids).await.unwrap();

        let outcomes: Vec<bool> = batch.results.iter().map(|r| r.success).collect();
        assert_eq!(outcomes, vec![true, false, true]);
        assert_eq!(store.len(Entity::SavedProperty).await, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);
        assert!(store.fetch_records(Entity::Property, &RecordQuery::new()).await.is_err());
    }
}
