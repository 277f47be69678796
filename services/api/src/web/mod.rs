pub mod auth;
pub mod preferences;
pub mod profiles;
pub mod readings;
pub mod rest;
pub mod state;

use aura_tarot_core::PortError;
use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tracing::error;

use self::state::AppState;

/// Builds every JSON route over the shared state. CORS and Swagger UI are
/// layered on by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/session", get(rest::session_handler))
        .route(
            "/profiles",
            get(profiles::list_profiles_handler).post(profiles::create_profile_handler),
        )
        .route("/profiles/{id}/name", put(profiles::rename_profile_handler))
        .route("/profiles/{id}/activate", post(profiles::activate_profile_handler))
        .route(
            "/settings",
            get(preferences::get_settings_handler).put(preferences::update_settings_handler),
        )
        .route(
            "/language",
            get(preferences::get_language_handler).put(preferences::set_language_handler),
        )
        .route(
            "/draft",
            get(preferences::get_draft_handler)
                .put(preferences::set_draft_handler)
                .delete(preferences::clear_draft_handler),
        )
        .route(
            "/readings",
            get(readings::list_readings_handler).post(readings::create_reading_handler),
        )
        .with_state(state)
}

/// Maps a port failure onto the status the client should see.
pub(crate) fn port_failure(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unexpected(_) | PortError::Storage(_) => {
            error!("Request failed: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}
