// Advisory identity check.
//
// Reads `Authorization: Bearer <identity token>`, verifies it when a verifier
// is configured, and records the outcome in the trace span of the request.
// It never rejects a request: access to Drive is governed by the access token
// alone.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use super::state::AppState;
use crate::core::identity::verify_advisory;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn identity_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let bearer = bearer_token(request.headers()).map(str::to_string);
    let outcome = verify_advisory(state.verifier.as_deref(), bearer.as_deref()).await;

    let span = tracing::info_span!("caller", identity = %outcome.label());
    next.run(request).instrument(span).await
}
