//! services/api/src/web/preferences.rs
//!
//! Per-profile preferences: interpretation settings, interface language and
//! the question draft. Every handler reads and writes the active profile.

use axum::{extract::State, http::StatusCode, Json};
use aura_tarot_core::{AiProvider, AiSettings, AiSettingsPatch, Language};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::{port_failure, state::AppState};

//=========================================================================================
// Payloads
//=========================================================================================

/// Interpretation settings. On update, omitted fields keep their value.
#[derive(Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBody {
    #[schema(value_type = Option<String>, example = "deepseek")]
    pub provider: Option<AiProvider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl From<&AiSettings> for SettingsBody {
    fn from(settings: &AiSettings) -> Self {
        Self {
            provider: Some(settings.provider),
            api_key: Some(settings.api_key.clone()),
            model: Some(settings.model.clone()),
        }
    }
}

impl From<SettingsBody> for AiSettingsPatch {
    fn from(body: SettingsBody) -> Self {
        Self {
            provider: body.provider,
            api_key: body.api_key,
            model: body.model,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LanguageBody {
    /// `zh` or `en`.
    pub language: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DraftBody {
    pub question: String,
}

//=========================================================================================
// Settings
//=========================================================================================

#[utoipa::path(
    get,
    path = "/settings",
    responses((status = 200, description = "Settings of the active profile", body = SettingsBody))
)]
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<SettingsBody> {
    let session = state.session.lock().await;
    Json(SettingsBody::from(session.settings()))
}

#[utoipa::path(
    put,
    path = "/settings",
    request_body = SettingsBody,
    responses(
        (status = 200, description = "Merged settings", body = SettingsBody),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SettingsBody>,
) -> Result<Json<SettingsBody>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let merged = session
        .update_settings(body.into())
        .map_err(port_failure)?;
    Ok(Json(SettingsBody::from(&merged)))
}

//=========================================================================================
// Language
//=========================================================================================

#[utoipa::path(
    get,
    path = "/language",
    responses((status = 200, description = "Language of the active profile", body = LanguageBody))
)]
pub async fn get_language_handler(State(state): State<Arc<AppState>>) -> Json<LanguageBody> {
    let session = state.session.lock().await;
    Json(LanguageBody {
        language: session.language().code().to_string(),
    })
}

#[utoipa::path(
    put,
    path = "/language",
    request_body = LanguageBody,
    responses(
        (status = 200, description = "Language stored", body = LanguageBody),
        (status = 400, description = "Unsupported language code")
    )
)]
pub async fn set_language_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LanguageBody>,
) -> Result<Json<LanguageBody>, (StatusCode, String)> {
    let language = Language::from_code(&body.language).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unsupported language '{}'", body.language),
        )
    })?;
    let mut session = state.session.lock().await;
    session.set_language(language).map_err(port_failure)?;
    Ok(Json(LanguageBody {
        language: language.code().to_string(),
    }))
}

//=========================================================================================
// Draft question
//=========================================================================================

#[utoipa::path(
    get,
    path = "/draft",
    responses((status = 200, description = "The unsent question", body = DraftBody))
)]
pub async fn get_draft_handler(State(state): State<Arc<AppState>>) -> Json<DraftBody> {
    let session = state.session.lock().await;
    Json(DraftBody {
        question: session.draft_question().to_string(),
    })
}

#[utoipa::path(
    put,
    path = "/draft",
    request_body = DraftBody,
    responses(
        (status = 200, description = "Draft stored", body = DraftBody),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn set_draft_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DraftBody>,
) -> Result<Json<DraftBody>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    session
        .set_draft_question(&body.question)
        .map_err(port_failure)?;
    Ok(Json(body))
}

#[utoipa::path(
    delete,
    path = "/draft",
    responses(
        (status = 204, description = "Draft cleared"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_draft_handler(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    session.clear_draft_question().map_err(port_failure)?;
    Ok(StatusCode::NO_CONTENT)
}
