//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileStore, OpenAiInterpretationAdapter},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use aura_tarot_core::{KeyValueStore, MemoryStore, SessionOptions, SystemClock, TarotSession};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Key-Value Store ---
    let store: Arc<dyn KeyValueStore> = match &config.data_path {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => {
            warn!("DATA_PATH is not set; profiles and history will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Bootstrap the Session ---
    let session = TarotSession::open(
        store,
        Arc::new(SystemClock),
        SessionOptions {
            password_scheme: config.password_scheme,
            max_readings: config.max_readings,
        },
    )?;

    // --- 4. Build the Shared AppState ---
    let interpreter = Arc::new(OpenAiInterpretationAdapter::new(config.provider_keys.clone()));
    let app_state = Arc::new(AppState::new(session, interpreter));

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
