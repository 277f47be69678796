//! services/api/src/web/profiles.rs
//!
//! Local profile management. Switching needs no credentials: any profile
//! present on this device may be activated.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use aura_tarot_core::UserProfile;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::{
    port_failure,
    rest::{session_view, SessionView},
    state::AppState,
};

#[derive(Deserialize, ToSchema, Default)]
pub struct CreateProfileRequest {
    /// Display name. Omitted or blank names get the next `用户N` label.
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameProfileRequest {
    pub name: String,
}

/// List every profile in creation order.
#[utoipa::path(
    get,
    path = "/profiles",
    responses(
        (status = 200, description = "All local profiles")
    )
)]
pub async fn list_profiles_handler(State(state): State<Arc<AppState>>) -> Json<Vec<UserProfile>> {
    let session = state.session.lock().await;
    Json(session.list_profiles())
}

/// Create a profile and make it active.
#[utoipa::path(
    post,
    path = "/profiles",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created and active"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_profile_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let profile = session
        .create_profile(req.name.as_deref())
        .map_err(port_failure)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Change a profile's display name.
#[utoipa::path(
    put,
    path = "/profiles/{id}/name",
    request_body = RenameProfileRequest,
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile renamed"),
        (status = 404, description = "No such profile")
    )
)]
pub async fn rename_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameProfileRequest>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let profile = session.rename_profile(&id, &req.name).map_err(port_failure)?;
    Ok(Json(profile))
}

/// Make another local profile the active one.
#[utoipa::path(
    post,
    path = "/profiles/{id}/activate",
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile activated", body = SessionView),
        (status = 404, description = "No such profile")
    )
)]
pub async fn activate_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    session.switch_profile(&id).map_err(port_failure)?;
    Ok(Json(session_view(&session).map_err(port_failure)?))
}
