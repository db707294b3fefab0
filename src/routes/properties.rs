use crate::core::format_price;
use crate::models::{FeaturedRequest, Property, PropertyDetailResponse, PropertyListResponse, RecordId, SearchPropertiesRequest};
use crate::routes::{error_body, repository_error, validation_failed, AppState};
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

const STALE_NOTICE: &str = "Unable to load properties. Showing previously loaded results.";

pub fn configure(cfg: &mut web::ServiceConfig) {
    // featured is registered ahead of the {id} route so it is not taken for an id
    cfg.route("/properties", web::get().to(search_properties))
        .route("/properties/featured", web::get().to(featured_properties))
        .route("/properties/{id}", web::get().to(get_property));
}

/// Current catalog, falling back to the last good one when the store fails
///
/// The second value is the notice to show when the fallback was used.
pub(crate) async fn load_catalog(state: &AppState) -> Result<(Vec<Property>, Option<String>), HttpResponse> {
    match state.properties.get_all().await {
        Ok(properties) => Ok((properties, None)),
        Err(e) => match state.properties.cached().await {
            Some(properties) => {
                tracing::warn!("Serving cached catalog of {} properties: {}", properties.len(), e);
                Ok((properties, Some(STALE_NOTICE.to_string())))
            }
            None => {
                tracing::error!("Failed to load properties: {}", e);
                Err(error_body(StatusCode::BAD_GATEWAY, "Failed to load properties", e.to_string()))
            }
        },
    }
}

/// Property search endpoint
///
/// GET /api/v1/properties?q=&minPrice=&maxPrice=&minBeds=&minBaths=&types=House,Condo&location=
async fn search_properties(state: web::Data<AppState>, query: web::Query<SearchPropertiesRequest>) -> impl Responder {
    if let Err(errors) = query.validate() {
        tracing::info!("Validation failed for property search: {:?}", errors);
        return validation_failed(errors);
    }

    let criteria = query.to_criteria();
    let (catalog, notice) = match load_catalog(&state).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let properties = state.engine.filter(&catalog, &criteria, query.search_term());
    tracing::debug!("Search matched {} of {} properties", properties.len(), catalog.len());

    HttpResponse::Ok().json(PropertyListResponse {
        total: properties.len(),
        properties,
        active_filters: criteria.active_filters(),
        notice,
    })
}

/// GET /api/v1/properties/featured?limit=6
async fn featured_properties(state: web::Data<AppState>, query: web::Query<FeaturedRequest>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    let (catalog, notice) = match load_catalog(&state).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let properties = state.engine.featured(&catalog, query.limit);
    HttpResponse::Ok().json(PropertyListResponse {
        total: properties.len(),
        properties,
        active_filters: Vec::new(),
        notice,
    })
}

/// GET /api/v1/properties/{id}
async fn get_property(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = RecordId::new(path.into_inner());

    match state.properties.get_by_id(&id).await {
        Ok(property) => {
            let is_saved = state.saved.is_saved(&property.id).await;
            HttpResponse::Ok().json(PropertyDetailResponse {
                display_price: format_price(property.price),
                property,
                is_saved,
            })
        }
        Err(e) => {
            if !e.is_not_found() {
                tracing::error!("Failed to load property {}: {}", id, e);
            }
            repository_error(&e)
        }
    }
}
