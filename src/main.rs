use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use homescout::config::{Settings, StoreBackend};
use homescout::core::{FilterEngine, SavedStateReconciler};
use homescout::routes::{self, AppState};
use homescout::services::{
    load_mock_store, PropertyRepository, RecordStore, RemoteRecordStore, SavedPropertyRepository, StoreCollections,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(settings: Option<&Settings>) {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| settings.map(|s| s.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .or_else(|| settings.map(|s| s.logging.format.clone()))
        .unwrap_or_else(|| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn RecordStore>> {
    match settings.store.backend {
        StoreBackend::Mock => {
            let store = load_mock_store(&settings.store.fixtures_dir, settings.store.mock_latency())
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Remote => {
            let collections = StoreCollections {
                property: settings.collection.property.clone(),
                saved_property: settings.collection.saved_property.clone(),
            };
            let store = RemoteRecordStore::new(
                settings.store.endpoint.clone(),
                settings.store.api_key.clone(),
                settings.store.project_id.clone(),
                settings.store.database_id.clone(),
                collections,
                settings.store.request_timeout(),
            )
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    init_logging(settings.as_ref().ok());

    info!("Starting HomeScout listing service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    info!("Configuration loaded successfully");

    let store = build_store(&settings).await?;
    let backend = store.backend_name();
    info!("Record store initialized ({})", backend);

    let timeout = settings.store.request_timeout();
    let properties = Arc::new(PropertyRepository::new(
        store.clone(),
        timeout,
        settings.catalog.cache_size,
        Duration::from_secs(settings.catalog.cache_ttl_secs),
    ));
    let saved = Arc::new(SavedStateReconciler::new(SavedPropertyRepository::new(store, timeout)));

    // Warm the catalog and the saved index; the service still starts if the store is down
    match properties.get_all().await {
        Ok(all) => info!("Catalog loaded with {} properties", all.len()),
        Err(e) => warn!("Initial catalog load failed: {}", e),
    }
    match saved.sync().await {
        Ok(count) => info!("Saved index loaded with {} entries", count),
        Err(e) => warn!("Initial saved-property sync failed: {}", e),
    }

    let app_state = AppState {
        properties,
        saved,
        engine: FilterEngine::new(settings.filters.featured_limit),
        backend,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
