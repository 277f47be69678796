//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for account registration, login, and logout.
//!
//! There is no session cookie: the process holds one session, and logging in
//! simply makes the account's profile the active one.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use aura_tarot_core::{AuthError, Language};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::{
    port_failure,
    rest::{session_view, SessionView},
    state::AppState,
};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Maps an authentication failure onto a status and the message in the
/// session's current language.
fn auth_failure(e: AuthError, language: Language) -> (StatusCode, String) {
    let status = match &e {
        AuthError::MissingCredentials
        | AuthError::UsernameTooShort
        | AuthError::PasswordTooShort
        | AuthError::UsernameTaken => StatusCode::BAD_REQUEST,
        AuthError::UserNotFound | AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
        AuthError::Storage(_) => {
            error!("Authentication storage failure: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.localized(language).to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create an account and sign in to it
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created and active", body = SessionView),
        (status = 400, description = "Invalid credentials or username taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let language = session.language();
    session
        .register(&req.username, &req.password)
        .map_err(|e| auth_failure(e, language))?;
    let view = session_view(&session).map_err(port_failure)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /auth/login - Sign in to an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionView),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Unknown user or wrong password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let language = session.language();
    session
        .login(&req.username, &req.password)
        .map_err(|e| auth_failure(e, language))?;
    Ok(Json(session_view(&session).map_err(port_failure)?))
}

/// POST /auth/logout - Return to the guest profile
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = SessionView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    session.logout().map_err(port_failure)?;
    Ok(Json(session_view(&session).map_err(port_failure)?))
}
