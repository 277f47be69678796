//! services/api/src/web/readings.rs
//!
//! Reading history and the gated reading flow.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use aura_tarot_core::{
    reading::apology, DrawnCard, Language, Reading, ReadingDraft, ReadingError, SpreadRef,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreateReadingRequest {
    #[serde(default)]
    pub question: String,
    #[schema(value_type = Object)]
    pub spread: SpreadRef,
    #[schema(value_type = Vec<Object>)]
    pub cards: Vec<DrawnCard>,
}

fn reading_failure(e: ReadingError, language: Language) -> (StatusCode, String) {
    let status = match &e {
        ReadingError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
        ReadingError::ProfileChanged => StatusCode::CONFLICT,
        ReadingError::NoCards => StatusCode::BAD_REQUEST,
        ReadingError::Storage(_) => {
            error!("Reading storage failure: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.localized(language).to_string())
}

/// The active profile's readings, most recent first.
#[utoipa::path(
    get,
    path = "/readings",
    responses((status = 200, description = "Reading history"))
)]
pub async fn list_readings_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Reading>> {
    let session = state.session.lock().await;
    Json(session.readings().to_vec())
}

/// Interpret the drawn cards and store the reading.
///
/// The session lock is released while the interpretation service runs. If
/// the active profile changes in the meantime, the result is discarded.
#[utoipa::path(
    post,
    path = "/readings",
    request_body = CreateReadingRequest,
    responses(
        (status = 201, description = "Reading interpreted and saved"),
        (status = 400, description = "No cards were drawn"),
        (status = 409, description = "The active profile changed during the reading"),
        (status = 429, description = "The guest's free readings for today are used up"),
        (status = 502, description = "The interpretation service failed; the body is the apology text")
    )
)]
pub async fn create_reading_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReadingRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let draft = ReadingDraft {
        question: req.question,
        spread: req.spread,
        cards: req.cards,
    };

    let prepared = {
        let session = state.session.lock().await;
        let language = session.language();
        session
            .prepare_reading(draft)
            .map_err(|e| reading_failure(e, language))?
    };
    let language = prepared.request.language;

    let interpretation = match state.interpreter.interpret(&prepared.request).await {
        Ok(text) => text,
        Err(e) => {
            error!("Interpretation failed: {:?}", e);
            return Err((StatusCode::BAD_GATEWAY, apology(&e, language)));
        }
    };

    let mut session = state.session.lock().await;
    let reading = session
        .complete_reading(prepared, interpretation)
        .map_err(|e| reading_failure(e, language))?;
    info!(reading_id = %reading.id, "Reading created");
    Ok((StatusCode::CREATED, Json(reading)))
}
