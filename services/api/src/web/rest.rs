//! services/api/src/web/rest.rs
//!
//! The session overview endpoint and the master definition for the OpenAPI
//! specification.

use crate::web::{auth, port_failure, preferences, profiles, readings, state::AppState};
use aura_tarot_core::{PortResult, TarotSession, UserProfile};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        session_handler,
        profiles::list_profiles_handler,
        profiles::create_profile_handler,
        profiles::rename_profile_handler,
        profiles::activate_profile_handler,
        preferences::get_settings_handler,
        preferences::update_settings_handler,
        preferences::get_language_handler,
        preferences::set_language_handler,
        preferences::get_draft_handler,
        preferences::set_draft_handler,
        preferences::clear_draft_handler,
        readings::list_readings_handler,
        readings::create_reading_handler,
    ),
    components(
        schemas(
            SessionView,
            auth::CredentialsRequest,
            profiles::CreateProfileRequest,
            profiles::RenameProfileRequest,
            preferences::SettingsBody,
            preferences::LanguageBody,
            preferences::DraftBody,
            readings::CreateReadingRequest,
        )
    ),
    tags(
        (name = "Aura Tarot API", description = "Local profiles, accounts, preferences and reading history.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Session Overview
//=========================================================================================

/// The active profile and what it is currently allowed to do.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[schema(value_type = Object)]
    pub profile: UserProfile,
    pub is_guest: bool,
    /// Free readings left today. Signed-in profiles are unlimited and always
    /// report the full daily allowance.
    pub guest_remaining_today: u32,
    pub language: String,
}

pub(crate) fn session_view(session: &TarotSession) -> PortResult<SessionView> {
    Ok(SessionView {
        profile: session.active_profile().clone(),
        is_guest: session.is_guest(),
        guest_remaining_today: session.guest_remaining_today()?,
        language: session.language().code().to_string(),
    })
}

/// Describe the active profile.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "The active session", body = SessionView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let session = state.session.lock().await;
    Ok(Json(session_view(&session).map_err(port_failure)?))
}
