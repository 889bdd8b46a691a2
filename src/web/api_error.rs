// Maps letter errors and unreadable request bodies onto gateway responses.
//
// Only the status and a fixed message reach the caller. Upstream detail is
// logged here and nowhere else.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::api_types::ErrorBody;
use crate::core::letters::LetterError;

const AUTH_FAILED_MESSAGE: &str =
    "Google Drive authentication failed. Please log out and log in again.";

#[derive(Debug)]
pub enum ApiError {
    /// A letter error plus the generic message to show for upstream failures.
    Letter {
        error: LetterError,
        upstream_message: &'static str,
    },
    /// The request body could not be read as JSON.
    InvalidBody(String),
}

impl ApiError {
    pub fn new(error: LetterError, upstream_message: &'static str) -> Self {
        ApiError::Letter {
            error,
            upstream_message,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidBody(detail) => {
                tracing::warn!("Rejected request body: {}", detail);
                (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid request body: {}", detail),
                )
            }
            ApiError::Letter {
                error: error @ LetterError::MissingToken,
                ..
            } => (StatusCode::BAD_REQUEST, error.to_string()),
            ApiError::Letter {
                error: LetterError::Authentication,
                ..
            } => {
                tracing::warn!("Drive rejected the caller's access token");
                (StatusCode::UNAUTHORIZED, AUTH_FAILED_MESSAGE.to_string())
            }
            ApiError::Letter {
                error,
                upstream_message,
            } => {
                tracing::error!("{}: {}", upstream_message, error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    upstream_message.to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
