// =============================================================================
// GOOGLE OAUTH 2.0 SIGN-IN
// =============================================================================
//
// Implements the core `IdentityProvider` trait with Google's authorization
// code flow for installed applications:
//
// 1. Build the consent URL (OpenID + Drive file scope) with a random `state`.
// 2. Hand it to an `AuthorizationCodeReceiver`, which shows it to the user and
//    returns what came back: the bare code, or the whole redirect URL.
// 3. Exchange the code at the token endpoint for an ID token and an access
//    token.
//
// Signing out revokes the access token. Nothing here refreshes tokens.
//
// **Environment Variables:**
// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - OAuth client credentials
// - `GOOGLE_REDIRECT_URL` - Must be set explicitly for every environment

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::core::session::{AuthError, IdentityProvider, ProviderCredentials};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// OpenID for the identity token, `drive.file` for the letters.
const SCOPES: &str = "openid email profile https://www.googleapis.com/auth/drive.file";

/// OAuth client settings. Any of them may be missing until sign-in is
/// actually attempted.
#[derive(Debug, Clone, Default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_url: Option<String>,
}

struct OAuthClient<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_url: &'a str,
}

impl OAuthSettings {
    fn require(&self) -> Result<OAuthClient<'_>, AuthError> {
        fn field<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AuthError> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AuthError::NotConfigured(format!("{} is not set", name)))
        }

        Ok(OAuthClient {
            client_id: field(&self.client_id, "GOOGLE_CLIENT_ID")?,
            client_secret: field(&self.client_secret, "GOOGLE_CLIENT_SECRET")?,
            redirect_url: field(&self.redirect_url, "GOOGLE_REDIRECT_URL")?,
        })
    }
}

/// Shows the consent URL to the user and collects the answer.
#[async_trait]
pub trait AuthorizationCodeReceiver: Send + Sync {
    /// Returns `None` when the user gives up.
    async fn receive(&self, authorization_url: &str) -> Result<Option<String>, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct GoogleOAuthProvider<R: AuthorizationCodeReceiver> {
    http: Client,
    settings: OAuthSettings,
    receiver: R,
}

impl<R: AuthorizationCodeReceiver> GoogleOAuthProvider<R> {
    pub fn new(settings: OAuthSettings, receiver: R) -> Self {
        Self {
            http: Client::new(),
            settings,
            receiver,
        }
    }

    fn new_state() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    fn authorization_url(client: &OAuthClient<'_>, state: &str) -> Result<Url, AuthError> {
        Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", client.client_id),
                ("redirect_uri", client.redirect_url),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AuthError::Provider(e.to_string()))
    }

    async fn exchange_code(
        &self,
        client: &OAuthClient<'_>,
        code: &str,
    ) -> Result<ProviderCredentials, AuthError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", client.client_id),
                ("client_secret", client.client_secret),
                ("redirect_uri", client.redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) if err.error == "access_denied" => AuthError::Denied(err.error),
                Ok(err) => AuthError::Provider(format!(
                    "{}: {}",
                    err.error,
                    err.error_description.unwrap_or_default()
                )),
                Err(_) => AuthError::Provider(format!("Token exchange failed ({}): {}", status, text)),
            });
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let identity_token = tokens.id_token.ok_or_else(|| {
            AuthError::Provider("token response did not include an ID token".to_string())
        })?;

        Ok(ProviderCredentials {
            identity_token,
            access_token: tokens.access_token,
        })
    }
}

/// Pull the authorization code out of whatever the user pasted: a full
/// redirect URL, a bare query string, or just the code.
pub fn parse_callback(answer: &str, expected_state: &str) -> Result<String, AuthError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(AuthError::Cancelled);
    }

    if !answer.contains('=') {
        return Ok(answer.to_string());
    }

    let url = if answer.starts_with("http://") || answer.starts_with("https://") {
        Url::parse(answer)
    } else {
        Url::parse(&format!("http://localhost/?{}", answer.trim_start_matches('?')))
    }
    .map_err(|e| AuthError::Provider(format!("could not read the redirect URL: {}", e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" if value == "access_denied" => {
                return Err(AuthError::Denied(value.into_owned()));
            }
            "error" => return Err(AuthError::Provider(value.into_owned())),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }

    code.ok_or_else(|| AuthError::Provider("redirect URL has no authorization code".to_string()))
}

#[async_trait]
impl<R: AuthorizationCodeReceiver> IdentityProvider for GoogleOAuthProvider<R> {
    async fn sign_in(&self) -> Result<ProviderCredentials, AuthError> {
        let client = self.settings.require()?;
        let state = Self::new_state();
        let url = Self::authorization_url(&client, &state)?;

        let answer = self
            .receiver
            .receive(url.as_str())
            .await?
            .ok_or(AuthError::Cancelled)?;

        let code = parse_callback(&answer, &state)?;
        self.exchange_code(&client, &code).await
    }

    async fn sign_out(&self, access_token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = access_token else {
            return Ok(());
        };

        let response = self
            .http
            .post(REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "token revocation returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
