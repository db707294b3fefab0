// Core listing logic
pub mod engine;
pub mod filters;
pub mod format;
pub mod reconciler;

pub use engine::{filter_properties, FilterEngine, DEFAULT_FEATURED_LIMIT};
pub use format::{format_price, format_price_compact};
pub use reconciler::{join_saved, ClearAllReport, SavedStateReconciler};
