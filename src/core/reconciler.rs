use crate::models::{JoinOrder, NewSavedProperty, Property, RecordId, SavedProperty};
use crate::services::repository::{RepositoryError, SavedPropertyRepository, ALREADY_SAVED};
use crate::services::store::Entity;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::RwLock;

/// Outcome of removing several bookmarks at once
#[derive(Debug, Default)]
pub struct ClearAllReport {
    pub removed: Vec<RecordId>,
    pub failures: Vec<(RecordId, RepositoryError)>,
}

impl ClearAllReport {
    /// True only when every requested bookmark was removed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Marks a property id as having a save in flight until dropped
///
/// Dropping releases the id, so a cancelled save does not block later ones.
struct InFlightSave<'a> {
    set: &'a Mutex<HashSet<RecordId>>,
    property_id: RecordId,
}

impl<'a> InFlightSave<'a> {
    fn acquire(set: &'a Mutex<HashSet<RecordId>>, property_id: &RecordId) -> Option<Self> {
        let mut ids = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !ids.insert(property_id.clone()) {
            return None;
        }
        Some(Self {
            set,
            property_id: property_id.clone(),
        })
    }
}

impl Drop for InFlightSave<'_> {
    fn drop(&mut self) {
        let mut ids = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&self.property_id);
    }
}

/// Keeps the set of saved property ids in step with save/unsave actions
///
/// The index maps a property id to its bookmark so `is_saved` is a hash
/// lookup. Locks are never held across a store call; state is re-checked
/// against the repository right before anything is created or deleted.
pub struct SavedStateReconciler {
    repository: SavedPropertyRepository,
    index: RwLock<HashMap<RecordId, SavedProperty>>,
    in_flight: Mutex<HashSet<RecordId>>,
}

impl SavedStateReconciler {
    pub fn new(repository: SavedPropertyRepository) -> Self {
        Self {
            repository,
            index: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Reload the index from the store
    ///
    /// On failure the previous index is left as it was.
    pub async fn sync(&self) -> Result<usize, RepositoryError> {
        let saved = self.repository.get_all().await?;
        let fresh: HashMap<RecordId, SavedProperty> =
            saved.into_iter().map(|s| (s.property_id.clone(), s)).collect();
        let count = fresh.len();

        *self.index.write().await = fresh;
        tracing::debug!("Saved-property index synced ({} entries)", count);
        Ok(count)
    }

    pub async fn is_saved(&self, property_id: &RecordId) -> bool {
        self.index.read().await.contains_key(property_id)
    }

    pub async fn saved_count(&self) -> usize {
        self.index.read().await.len()
    }

    /// Every indexed bookmark, oldest save first
    pub async fn snapshot(&self) -> Vec<SavedProperty> {
        let mut saved: Vec<SavedProperty> = self.index.read().await.values().cloned().collect();
        saved.sort_by(|a, b| a.saved_date.cmp(&b.saved_date).then_with(|| a.id.cmp(&b.id)));
        saved
    }

    /// Bookmark a property
    pub async fn save(&self, property_id: &RecordId, notes: Option<String>) -> Result<SavedProperty, RepositoryError> {
        if self.is_saved(property_id).await {
            return Err(RepositoryError::Duplicate(ALREADY_SAVED.into()));
        }
        let Some(guard) = InFlightSave::acquire(&self.in_flight, property_id) else {
            tracing::debug!("Save for {} already in flight", property_id);
            return Err(RepositoryError::Duplicate(ALREADY_SAVED.into()));
        };

        let new = NewSavedProperty {
            property_id: property_id.clone(),
            notes,
        };
        let result = self.repository.create(&new).await;
        drop(guard);

        match result {
            Ok(saved) => {
                self.index.write().await.insert(property_id.clone(), saved.clone());
                tracing::info!("Saved property {}", property_id);
                Ok(saved)
            }
            Err(RepositoryError::Duplicate(message)) => {
                // saved elsewhere since the last sync; pick up the existing bookmark
                if let Ok(existing) = self.repository.get_by_property(property_id).await {
                    self.index.write().await.insert(property_id.clone(), existing);
                }
                Err(RepositoryError::Duplicate(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the bookmark for a property
    pub async fn unsave(&self, property_id: &RecordId) -> Result<(), RepositoryError> {
        let indexed = self.index.read().await.get(property_id).map(|s| s.id.clone());
        let record_id = match indexed {
            Some(id) => id,
            None => self.repository.get_by_property(property_id).await?.id,
        };

        match self.repository.delete(&record_id).await {
            Ok(true) => {
                self.index.write().await.remove(property_id);
                tracing::info!("Removed saved property {}", property_id);
                Ok(())
            }
            Ok(false) => Err(RepositoryError::Fetch(format!(
                "Failed to remove saved property {}",
                property_id
            ))),
            Err(RepositoryError::NotFound { .. }) => {
                self.index.write().await.remove(property_id);
                Err(RepositoryError::NotFound {
                    entity: Entity::SavedProperty,
                    id: property_id.clone(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Remove every listed bookmark, continuing past individual failures
    pub async fn clear_all(&self, property_ids: &[RecordId]) -> ClearAllReport {
        let mut report = ClearAllReport::default();
        let indexed: Vec<(RecordId, Option<RecordId>)> = {
            let index = self.index.read().await;
            property_ids
                .iter()
                .map(|property_id| (property_id.clone(), index.get(property_id).map(|s| s.id.clone())))
                .collect()
        };

        let mut targets: Vec<(RecordId, RecordId)> = Vec::with_capacity(indexed.len());
        for (property_id, record_id) in indexed {
            match record_id {
                Some(record_id) => targets.push((property_id, record_id)),
                // saved by another client since the last sync
                None => match self.repository.get_by_property(&property_id).await {
                    Ok(saved) => targets.push((property_id, saved.id)),
                    Err(e) => report.failures.push((property_id, e)),
                },
            }
        }

        let record_ids: Vec<RecordId> = targets.iter().map(|(_, record_id)| record_id.clone()).collect();
        let outcomes = if record_ids.is_empty() {
            Vec::new()
        } else {
            self.repository.delete_many(&record_ids).await
        };

        let mut index = self.index.write().await;
        for ((property_id, _), (_, outcome)) in targets.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    index.remove(&property_id);
                    report.removed.push(property_id);
                }
                Err(e) => {
                    if e.is_not_found() {
                        index.remove(&property_id);
                    }
                    report.failures.push((property_id, e));
                }
            }
        }
        drop(index);

        if report.is_complete() {
            tracing::info!("Cleared {} saved properties", report.removed.len());
        } else {
            tracing::warn!(
                "Cleared {} saved properties, {} failed",
                report.removed.len(),
                report.failures.len()
            );
        }
        report
    }

    /// Property ids currently indexed, in save order
    pub async fn saved_ids(&self) -> Vec<RecordId> {
        self.snapshot().await.into_iter().map(|s| s.property_id).collect()
    }

    /// Properties that are saved, as an inner join with `properties`
    pub async fn saved_listings(&self, properties: &[Property], order: JoinOrder) -> Vec<Property> {
        let index = self.index.read().await;
        join_saved(properties, &index, order)
    }
}

/// Inner join of a property list against the saved index
///
/// `PropertyList` keeps the order of `properties`; `SavedDate` sorts oldest
/// save first, falling back to list order.
pub fn join_saved(
    properties: &[Property],
    saved: &HashMap<RecordId, SavedProperty>,
    order: JoinOrder,
) -> Vec<Property> {
    let mut joined: Vec<(usize, &Property)> = properties
        .iter()
        .enumerate()
        .filter(|(_, p)| saved.contains_key(&p.id))
        .collect();

    if order == JoinOrder::SavedDate {
        joined.sort_by(|(ia, a), (ib, b)| {
            let da = saved.get(&a.id).map(|s| s.saved_date);
            let db = saved.get(&b.id).map(|s| s.saved_date);
            da.cmp(&db).then(ia.cmp(ib))
        });
    }

    joined.into_iter().map(|(_, p)| p.clone()).collect()
}
