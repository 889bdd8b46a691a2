// Identity provider adapters: Google OAuth sign-in for the client and
// ID-token verification for the gateway.

pub mod google_oauth;
pub mod id_token_verifier;

pub use google_oauth::{AuthorizationCodeReceiver, GoogleOAuthProvider, OAuthSettings};
pub use id_token_verifier::JwksIdTokenVerifier;
