// Model exports
pub mod criteria;
pub mod domain;
pub mod requests;
pub mod responses;

pub use criteria::{ActiveFilter, FilterCriteria, FilterKey};
pub use domain::{JoinOrder, NewProperty, NewSavedProperty, Property, PropertyPatch, Record, RecordId, SavedProperty};
pub use requests::{ClearSavedRequest, FeaturedRequest, SavePropertyRequest, SavedListRequest, SearchPropertiesRequest};
pub use responses::{
    ClearAllResponse, ClearFailure, ErrorResponse, HealthResponse, PropertyDetailResponse, PropertyListResponse,
    SavedPropertiesResponse,
};
