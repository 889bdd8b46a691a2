pub mod session_models;
pub mod session_service;

pub use session_models::{
    Identity, ProviderCredentials, Session, ACCESS_TOKEN_KEY, IDENTITY_TOKEN_KEY,
};
pub use session_service::{
    AuthError, IdentityProvider, SessionService, TokenStore, TokenStoreError,
};
