//! HomeScout - property listing service
//!
//! Filters a catalog of property listings against buyer criteria and keeps
//! track of which listings a user has saved, on top of a hosted record store
//! or local mock data.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{filter_properties, FilterEngine, SavedStateReconciler};
pub use models::{FilterCriteria, JoinOrder, Property, RecordId, SavedProperty};
