use crate::models::{
    ClearAllResponse, ClearFailure, ClearSavedRequest, RecordId, SavePropertyRequest, SavedListRequest,
    SavedPropertiesResponse,
};
use crate::routes::properties::load_catalog;
use crate::routes::{repository_error, validation_failed, AppState};
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/saved", web::get().to(list_saved))
        .route("/saved", web::post().to(save_property))
        .route("/saved/clear", web::post().to(clear_saved))
        .route("/saved/{property_id}", web::delete().to(unsave_property));
}

/// Saved properties joined against the catalog
///
/// GET /api/v1/saved?order=savedDate
async fn list_saved(state: web::Data<AppState>, query: web::Query<SavedListRequest>) -> impl Responder {
    if let Err(e) = state.saved.sync().await {
        tracing::warn!("Saved-property sync failed, using last known state: {}", e);
    }

    let (catalog, _) = match load_catalog(&state).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let properties = state
        .saved
        .saved_listings(&catalog, query.order.unwrap_or_default())
        .await;

    HttpResponse::Ok().json(SavedPropertiesResponse {
        properties,
        saved_count: state.saved.saved_count().await,
    })
}

/// POST /api/v1/saved
///
/// Request body:
/// ```json
/// { "propertyId": "7", "notes": "string" }
/// ```
async fn save_property(state: web::Data<AppState>, req: web::Json<SavePropertyRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for save request: {:?}", errors);
        return validation_failed(errors);
    }

    let req = req.into_inner();
    let property_id = RecordId::new(req.property_id);

    match state.saved.save(&property_id, req.notes).await {
        Ok(saved) => HttpResponse::Created().json(saved),
        Err(e) => {
            tracing::info!("Save of property {} rejected: {}", property_id, e);
            repository_error(&e)
        }
    }
}

/// DELETE /api/v1/saved/{property_id}
async fn unsave_property(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let property_id = RecordId::new(path.into_inner());

    match state.saved.unsave(&property_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => repository_error(&e),
    }
}

/// Remove listed bookmarks, or all of them when no ids are given
///
/// POST /api/v1/saved/clear
async fn clear_saved(state: web::Data<AppState>, req: Option<web::Json<ClearSavedRequest>>) -> impl Responder {
    let requested = req.and_then(|r| r.into_inner().property_ids);
    let property_ids: Vec<RecordId> = match requested {
        Some(ids) => ids.into_iter().map(RecordId::new).collect(),
        None => state.saved.saved_ids().await,
    };

    let report = state.saved.clear_all(&property_ids).await;
    let complete = report.is_complete();
    let body = ClearAllResponse {
        removed: report.removed,
        failed: report
            .failures
            .into_iter()
            .map(|(property_id, e)| ClearFailure {
                property_id,
                message: e.to_string(),
            })
            .collect(),
        complete,
    };

    let status = if complete {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    HttpResponse::build(status).json(body)
}
