// Service exports
pub mod fixtures;
pub mod memory;
pub mod remote;
pub mod repository;
pub mod store;

pub use fixtures::{load_mock_store, FixtureError};
pub use memory::InMemoryRecordStore;
pub use remote::{RemoteRecordStore, StoreCollections};
pub use repository::{PropertyRepository, RepositoryError, SavedPropertyRepository};
pub use store::{Entity, RecordQuery, RecordStore, StoreError};
