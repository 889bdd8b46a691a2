// Request handlers for the gateway's `/api` routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;

use super::api_error::ApiError;
use super::api_types::{
    HealthResponse, LetterResponse, LettersResponse, SaveLetterBody, SaveLetterResponse,
    TokenQuery, SAVE_SUCCESS_MESSAGE,
};
use super::state::AppState;
use crate::core::letters::SaveLetterRequest;

/// `POST /api/save-letter`
///
/// A body that is not JSON is a 400 with the usual `{ error }` shape; fields
/// that are merely missing fall through to the token check.
pub async fn save_letter(
    State(state): State<AppState>,
    payload: Result<Json<SaveLetterBody>, JsonRejection>,
) -> Result<Json<SaveLetterResponse>, ApiError> {
    let Json(body) = payload?;
    let request = SaveLetterRequest {
        id: body.file_id,
        title: body.title,
        content: body.content,
    };

    let saved = state
        .letters
        .save_letter(body.access_token.as_deref(), request)
        .await
        .map_err(|e| ApiError::new(e, "Failed to save letter"))?;

    Ok(Json(SaveLetterResponse {
        success: true,
        file_id: saved.file_id,
        message: SAVE_SUCCESS_MESSAGE.to_string(),
    }))
}

/// `GET /api/letters?accessToken=...`
pub async fn list_letters(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<LettersResponse>, ApiError> {
    let letters = state
        .letters
        .list_letters(query.access_token.as_deref())
        .await
        .map_err(|e| ApiError::new(e, "Failed to fetch letters"))?;

    Ok(Json(LettersResponse {
        success: true,
        letters,
    }))
}

/// `GET /api/letter/{id}?accessToken=...`
pub async fn get_letter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<LetterResponse>, ApiError> {
    let letter = state
        .letters
        .get_letter(&id, query.access_token.as_deref())
        .await
        .map_err(|e| ApiError::new(e, "Failed to fetch letter"))?;

    Ok(Json(LetterResponse {
        success: true,
        content: letter.content,
        file_id: letter.id,
    }))
}

/// `GET /api/health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
