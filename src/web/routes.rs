// Route table and middleware stack for the gateway.

use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::identity_middleware::identity_middleware;
use super::state::AppState;
use crate::config::GatewayConfig;

/// Letters are plain text; this is generous.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/save-letter", post(handlers::save_letter))
        .route("/letters", get(handlers::list_letters))
        .route("/letter/{id}", get(handlers::get_letter))
        .route_layer(from_fn_with_state(state, identity_middleware))
        // Health stays outside the identity check
        .route("/health", get(handlers::health_check))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
}

/// Build the whole application: `/api`, and the single-page app when a
/// static directory is configured (unknown paths fall back to `index.html`).
pub fn create_app(state: AppState, config: &GatewayConfig) -> Router {
    let mut router = Router::new().nest("/api", api_routes(state.clone()));

    if let Some(dir) = &config.static_dir {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(spa);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
