// Web layer - the HTTP gateway in front of Google Drive.
// It turns requests into letter-service calls and errors into status codes;
// everything else lives in `core/`.

pub mod api_error;
pub mod api_types;
pub mod handlers;
pub mod identity_middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use server::GatewayServer;
pub use state::AppState;
