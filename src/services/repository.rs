use crate::models::{NewProperty, NewSavedProperty, Property, PropertyPatch, Record, RecordId, SavedProperty};
use crate::services::store::{Entity, FieldError, RecordQuery, RecordResult, RecordStore, StoreError};
use moka::future::Cache;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Typed failures surfaced by the repositories
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: Entity, id: RecordId },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Validation failed: {message}")]
    Validation { message: String, fields: Vec<FieldError> },
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Fetch(err.to_string())
    }
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

/// Run a store call under the request timeout
async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(RepositoryError::from),
        Err(_) => Err(StoreError::Timeout(timeout.as_millis() as u64).into()),
    }
}

/// Translate a failed per-record result into a typed error
fn record_failure(entity: Entity, id: Option<&RecordId>, result: RecordResult) -> RepositoryError {
    let message = result
        .message
        .unwrap_or_else(|| format!("{} operation rejected by store", entity));

    match (result.status, id) {
        (Some(404), Some(id)) => RepositoryError::NotFound {
            entity,
            id: id.clone(),
        },
        (Some(409), _) => RepositoryError::Duplicate(message),
        (Some(400) | Some(422), _) => RepositoryError::Validation {
            message,
            fields: result.errors,
        },
        _ if !result.errors.is_empty() => RepositoryError::Validation {
            message,
            fields: result.errors,
        },
        _ => RepositoryError::Fetch(message),
    }
}

/// Pull the single result out of a one-record batch
fn single_result(mut results: Vec<RecordResult>) -> RecordResult {
    if results.is_empty() {
        RecordResult::failed(500, "Store returned no result")
    } else {
        results.swap_remove(0)
    }
}

fn parse_property(record: Record) -> Result<Property, RepositoryError> {
    Property::from_record(record).map_err(|e| RepositoryError::Fetch(format!("Failed to parse property: {}", e)))
}

fn parse_saved(record: Record) -> Result<SavedProperty, RepositoryError> {
    SavedProperty::from_record(record)
        .map_err(|e| RepositoryError::Fetch(format!("Failed to parse saved property: {}", e)))
}

#[derive(Debug, Default)]
struct Catalog {
    ticket: u64,
    properties: Option<Vec<Property>>,
}

/// Repository for `property` records
///
/// Keeps the last successfully fetched list so views can fall back to it when
/// the store is unreachable. Each `get_all` draws a ticket; a response only
/// replaces the catalog if no later request has landed first.
pub struct PropertyRepository {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
    issued: AtomicU64,
    catalog: RwLock<Catalog>,
    by_id: Cache<RecordId, Property>,
}

impl PropertyRepository {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration, cache_size: u64, cache_ttl: Duration) -> Self {
        let by_id = moka::future::CacheBuilder::new(cache_size)
            .time_to_live(cache_ttl)
            .build();

        Self {
            store,
            timeout,
            issued: AtomicU64::new(0),
            catalog: RwLock::new(Catalog::default()),
            by_id,
        }
    }

    /// Fetch every property in store order
    pub async fn get_all(&self) -> Result<Vec<Property>, RepositoryError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let response = with_timeout(
            self.timeout,
            self.store.fetch_records(Entity::Property, &RecordQuery::new()),
        )
        .await?;

        if !response.success {
            return Err(RepositoryError::Fetch(
                response.message.unwrap_or_else(|| "Failed to load properties".into()),
            ));
        }

        let properties: Vec<Property> = response
            .data
            .into_iter()
            .filter_map(|record| match parse_property(record) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("Skipping malformed property record: {}", e);
                    None
                }
            })
            .collect();

        let mut catalog = self.catalog.write().await;
        if ticket > catalog.ticket {
            catalog.ticket = ticket;
            catalog.properties = Some(properties.clone());
            drop(catalog);
            for property in &properties {
                self.by_id.insert(property.id.clone(), property.clone()).await;
            }
            tracing::debug!("Catalog refreshed with {} properties (ticket {})", properties.len(), ticket);
            Ok(properties)
        } else {
            tracing::debug!(
                "Discarding stale property response (ticket {} < {})",
                ticket,
                catalog.ticket
            );
            Ok(catalog.properties.clone().unwrap_or(properties))
        }
    }

    /// Last successfully fetched list, if any
    pub async fn cached(&self) -> Option<Vec<Property>> {
        self.catalog.read().await.properties.clone()
    }

    pub async fn get_by_id(&self, id: &RecordId) -> Result<Property, RepositoryError> {
        if let Some(property) = self.by_id.get(id).await {
            tracing::trace!("Property cache hit: {}", id);
            return Ok(property);
        }

        let response = with_timeout(self.timeout, self.store.get_record_by_id(Entity::Property, id)).await?;
        let record = match (response.success, response.data) {
            (true, Some(record)) => record,
            _ => {
                return Err(RepositoryError::NotFound {
                    entity: Entity::Property,
                    id: id.clone(),
                })
            }
        };

        let property = parse_property(record)?;
        self.by_id.insert(id.clone(), property.clone()).await;
        Ok(property)
    }

    pub async fn create(&self, new: &NewProperty) -> Result<Property, RepositoryError> {
        single_outcome(self.create_many(std::slice::from_ref(new)).await)
    }

    /// Create several properties, reporting each outcome separately
    pub async fn create_many(&self, news: &[NewProperty]) -> Vec<Result<Property, RepositoryError>> {
        let now = chrono::Utc::now();
        let records = news.iter().map(|n| n.to_record(now)).collect();

        let batch = match with_timeout(self.timeout, self.store.create_records(Entity::Property, records)).await {
            Ok(batch) => batch,
            Err(e) => return news.iter().map(|_| Err(e.clone())).collect(),
        };

        let mut outcomes = Vec::with_capacity(news.len());
        for result in batch.results {
            let outcome = match (result.success, result.data.clone()) {
                (true, Some(record)) => parse_property(record),
                (true, None) => Err(RepositoryError::Fetch("Store returned no record".into())),
                (false, _) => Err(record_failure(Entity::Property, None, result)),
            };
            if let Ok(property) = &outcome {
                let mut catalog = self.catalog.write().await;
                if let Some(properties) = catalog.properties.as_mut() {
                    properties.push(property.clone());
                }
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    pub async fn update(&self, id: &RecordId, patch: &PropertyPatch) -> Result<Property, RepositoryError> {
        let batch = with_timeout(
            self.timeout,
            self.store.update_records(Entity::Property, vec![patch.to_record(id)]),
        )
        .await?;

        let result = single_result(batch.results);
        let property = match (result.success, result.data.clone()) {
            (true, Some(record)) => parse_property(record)?,
            (true, None) => return self.refetch(id).await,
            (false, _) => return Err(record_failure(Entity::Property, Some(id), result)),
        };

        self.by_id.insert(id.clone(), property.clone()).await;
        let mut catalog = self.catalog.write().await;
        if let Some(existing) = catalog
            .properties
            .as_mut()
            .and_then(|ps| ps.iter_mut().find(|p| p.id == *id))
        {
            *existing = property.clone();
        }
        Ok(property)
    }

    async fn refetch(&self, id: &RecordId) -> Result<Property, RepositoryError> {
        self.by_id.invalidate(id).await;
        self.get_by_id(id).await
    }

    /// Returns whether the store removed the record
    pub async fn delete(&self, id: &RecordId) -> Result<bool, RepositoryError> {
        let batch = with_timeout(
            self.timeout,
            self.store.delete_records(Entity::Property, std::slice::from_ref(id)),
        )
        .await?;

        let result = single_result(batch.results);
        if result.success {
            self.by_id.invalidate(id).await;
            let mut catalog = self.catalog.write().await;
            if let Some(properties) = catalog.properties.as_mut() {
                properties.retain(|p| p.id != *id);
            }
            return Ok(true);
        }

        match record_failure(Entity::Property, Some(id), result) {
            err @ RepositoryError::NotFound { .. } => Err(err),
            err => {
                tracing::warn!("Failed to delete property {}: {}", id, err);
                Ok(false)
            }
        }
    }
}

fn single_outcome<T>(mut outcomes: Vec<Result<T, RepositoryError>>) -> Result<T, RepositoryError> {
    if outcomes.is_empty() {
        Err(RepositoryError::Fetch("Store returned no result".into()))
    } else {
        outcomes.swap_remove(0)
    }
}

/// Repository for `saved_property` records
///
/// Guarantees at most one bookmark per property: creation looks the property
/// up first, and a uniqueness conflict from the store is reported the same way.
pub struct SavedPropertyRepository {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
}

pub const ALREADY_SAVED: &str = "Property already saved";

impl SavedPropertyRepository {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn get_all(&self) -> Result<Vec<SavedProperty>, RepositoryError> {
        let response = with_timeout(
            self.timeout,
            self.store.fetch_records(Entity::SavedProperty, &RecordQuery::new()),
        )
        .await?;

        if !response.success {
            return Err(RepositoryError::Fetch(
                response.message.unwrap_or_else(|| "Failed to load saved properties".into()),
            ));
        }

        Ok(response
            .data
            .into_iter()
            .filter_map(|record| match parse_saved(record) {
                Ok(saved) => Some(saved),
                Err(e) => {
                    tracing::warn!("Skipping malformed saved property record: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Bookmark for `property_id`
    pub async fn get_by_property(&self, property_id: &RecordId) -> Result<SavedProperty, RepositoryError> {
        let query = RecordQuery::new()
            .equal_to("property_id", vec![property_id.to_value()])
            .limit(1);
        let response = with_timeout(self.timeout, self.store.fetch_records(Entity::SavedProperty, &query)).await?;

        if !response.success {
            return Err(RepositoryError::Fetch(
                response.message.unwrap_or_else(|| "Failed to look up saved property".into()),
            ));
        }

        match response.data.into_iter().next() {
            Some(record) => parse_saved(record),
            None => Err(RepositoryError::NotFound {
                entity: Entity::SavedProperty,
                id: property_id.clone(),
            }),
        }
    }

    /// Bookmark a property
    ///
    /// The lookup before the create is only an early exit; the store's own
    /// uniqueness conflict is what decides.
    pub async fn create(&self, new: &NewSavedProperty) -> Result<SavedProperty, RepositoryError> {
        match self.get_by_property(&new.property_id).await {
            Ok(_) => return Err(RepositoryError::Duplicate(ALREADY_SAVED.into())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let record = new.to_record(chrono::Utc::now());
        let batch = with_timeout(self.timeout, self.store.create_records(Entity::SavedProperty, vec![record])).await?;

        let result = single_result(batch.results);
        match (result.success, result.data.clone()) {
            (true, Some(record)) => parse_saved(record),
            (true, None) => self.get_by_property(&new.property_id).await,
            (false, _) => match record_failure(Entity::SavedProperty, None, result) {
                RepositoryError::Duplicate(_) => Err(RepositoryError::Duplicate(ALREADY_SAVED.into())),
                err => Err(err),
            },
        }
    }

    /// Bookmark several properties in one store call
    ///
    /// Properties already bookmarked come back as `Duplicate` without being sent.
    pub async fn create_many(&self, news: &[NewSavedProperty]) -> Vec<Result<SavedProperty, RepositoryError>> {
        let ids: Vec<Value> = news.iter().map(|n| n.property_id.to_value()).collect();
        let query = RecordQuery::new().equal_to("property_id", ids);
        let existing: Vec<RecordId> =
            match with_timeout(self.timeout, self.store.fetch_records(Entity::SavedProperty, &query)).await {
                Ok(response) if response.success => response
                    .data
                    .into_iter()
                    .filter_map(|r| r.get("property_id").and_then(RecordId::from_value))
                    .collect(),
                Ok(response) => {
                    let err = RepositoryError::Fetch(response.message.unwrap_or_default());
                    return news.iter().map(|_| Err(err.clone())).collect();
                }
                Err(e) => return news.iter().map(|_| Err(e.clone())).collect(),
            };

        let now = chrono::Utc::now();
        let pending: Vec<usize> = (0..news.len())
            .filter(|&i| !existing.contains(&news[i].property_id))
            .collect();
        let records = pending.iter().map(|&i| news[i].to_record(now)).collect();

        let mut outcomes: Vec<Result<SavedProperty, RepositoryError>> = news
            .iter()
            .map(|_| Err(RepositoryError::Duplicate(ALREADY_SAVED.into())))
            .collect();
        if pending.is_empty() {
            return outcomes;
        }

        match with_timeout(self.timeout, self.store.create_records(Entity::SavedProperty, records)).await {
            Ok(batch) => {
                for (&i, result) in pending.iter().zip(batch.results) {
                    outcomes[i] = match (result.success, result.data.clone()) {
                        (true, Some(record)) => parse_saved(record),
                        (true, None) => Err(RepositoryError::Fetch("Store returned no record".into())),
                        (false, _) => Err(record_failure(Entity::SavedProperty, None, result)),
                    };
                }
            }
            Err(e) => {
                for &i in &pending {
                    outcomes[i] = Err(e.clone());
                }
            }
        }
        outcomes
    }

    pub async fn update_notes(&self, record_id: &RecordId, notes: Option<String>) -> Result<SavedProperty, RepositoryError> {
        let mut record = Record::new();
        record.insert("Id".into(), record_id.to_value());
        record.insert("notes".into(), notes.map(Value::from).unwrap_or(Value::Null));

        let batch = with_timeout(self.timeout, self.store.update_records(Entity::SavedProperty, vec![record])).await?;
        let result = single_result(batch.results);
        match (result.success, result.data.clone()) {
            (true, Some(record)) => parse_saved(record),
            (true, None) => Err(RepositoryError::Fetch("Store returned no record".into())),
            (false, _) => Err(record_failure(Entity::SavedProperty, Some(record_id), result)),
        }
    }

    /// Remove one bookmark by its own record id
    pub async fn delete(&self, record_id: &RecordId) -> Result<bool, RepositoryError> {
        let mut outcomes = self.delete_many(std::slice::from_ref(record_id)).await;
        match outcomes.pop() {
            Some((_, Ok(()))) => Ok(true),
            Some((_, Err(err @ RepositoryError::NotFound { .. }))) => Err(err),
            Some((_, Err(err))) => {
                tracing::warn!("Failed to delete saved property {}: {}", record_id, err);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Remove several bookmarks; every id gets its own outcome
    pub async fn delete_many(&self, record_ids: &[RecordId]) -> Vec<(RecordId, Result<(), RepositoryError>)> {
        let batch = match with_timeout(self.timeout, self.store.delete_records(Entity::SavedProperty, record_ids)).await {
            Ok(batch) => batch,
            Err(e) => return record_ids.iter().map(|id| (id.clone(), Err(e.clone()))).collect(),
        };

        let mut results = batch.results.into_iter();
        record_ids
            .iter()
            .map(|id| {
                let outcome = match results.next() {
                    Some(result) if result.success => Ok(()),
                    Some(result) => Err(record_failure(Entity::SavedProperty, Some(id), result)),
                    None => Err(RepositoryError::Fetch(format!("Store returned no result for {}", id))),
                };
                (id.clone(), outcome)
            })
            .collect()
    }
}
