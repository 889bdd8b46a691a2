use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use super::session_service::AuthError;

/// Token store key for the identity token.
pub const IDENTITY_TOKEN_KEY: &str = "identity_token";

/// Token store key for the Drive-scoped access token.
pub const ACCESS_TOKEN_KEY: &str = "drive_access_token";

/// Who is signed in, as asserted by the identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// The subset of OpenID claims we read.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl Identity {
    /// Read the identity out of a JWT identity token.
    ///
    /// The signature is not checked here: the client only needs to know who it
    /// thinks it is. Verification, where it happens at all, is the gateway's job.
    pub fn from_identity_token(token: &str) -> Result<Self, AuthError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::MalformedToken("not a JWT".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        let claims: IdentityClaims =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            display_name: claims.name,
        })
    }

    /// Best human-readable label for the user.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.user_id)
    }
}

/// Tokens handed back by the identity provider after a successful sign-in.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub identity_token: String,
    pub access_token: String,
}

/// A signed-in session.
///
/// `access_token` is optional because a restored session may have an identity
/// token without a Drive token. Nothing refreshes it; when it expires the user
/// signs out and back in.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub identity_token: String,
    pub access_token: Option<String>,
}

#[cfg(test)]
pub(crate) fn unsigned_identity_token(sub: &str, email: Option<&str>) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let claims = serde_json::json!({ "sub": sub, "email": email });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}
