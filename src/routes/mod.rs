// Route exports
pub mod properties;
pub mod saved;

use crate::core::{FilterEngine, SavedStateReconciler};
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{PropertyRepository, RepositoryError};
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub properties: Arc<PropertyRepository>,
    pub saved: Arc<SavedStateReconciler>,
    pub engine: FilterEngine,
    pub backend: &'static str,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(properties::configure)
            .configure(saved::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.properties.cached().await.is_some() {
        "healthy"
    } else {
        "starting"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

pub(crate) fn error_body(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    error_body(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string())
}

/// Map a repository failure onto an HTTP response
pub(crate) fn repository_error(err: &RepositoryError) -> HttpResponse {
    match err {
        RepositoryError::NotFound { .. } => error_body(StatusCode::NOT_FOUND, "Not found", err.to_string()),
        RepositoryError::Duplicate(message) => error_body(StatusCode::CONFLICT, "Duplicate", message.clone()),
        RepositoryError::Validation { message, fields } => {
            let detail = if fields.is_empty() {
                message.clone()
            } else {
                let labels: Vec<&str> = fields.iter().map(|f| f.field_label.as_str()).collect();
                format!("{} ({})", message, labels.join(", "))
            };
            error_body(StatusCode::BAD_REQUEST, "Validation failed", detail)
        }
        RepositoryError::Fetch(message) => error_body(StatusCode::BAD_GATEWAY, "Store unavailable", message.clone()),
    }
}
