// Verifies Google-issued identity tokens (plain Google Sign-In or Firebase)
// against the issuer's published JSON Web Key Set.
//
// Keys are cached for an hour. An unknown `kid` triggers a refresh, but at
// most one fetch is attempted per `MIN_REFRESH_INTERVAL`, failed or not.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::identity::{IdentityError, IdentityVerifier, VerifiedIdentity};

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
}

impl KeyCache {
    fn should_refresh(&self, kid: &str) -> bool {
        if self
            .last_attempt
            .is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL)
        {
            return false;
        }
        let fresh = self.fetched_at.is_some_and(|at| at.elapsed() < KEY_CACHE_TTL);
        let known = self.keys.as_ref().is_some_and(|keys| keys.find(kid).is_some());
        !(fresh && known)
    }

    fn lookup(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        let keys = self.keys.as_ref().ok_or_else(|| {
            IdentityError::KeysUnavailable("no signing keys fetched yet".to_string())
        })?;
        let jwk = keys
            .find(kid)
            .ok_or_else(|| IdentityError::Rejected(format!("unknown signing key {}", kid)))?;
        DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::Rejected(e.to_string()))
    }
}

pub struct JwksIdTokenVerifier {
    http: Client,
    jwks_url: String,
    issuers: Vec<String>,
    audience: String,
    cache: Arc<RwLock<KeyCache>>,
}

impl JwksIdTokenVerifier {
    pub fn new(jwks_url: impl Into<String>, issuers: Vec<String>, audience: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            jwks_url: jwks_url.into(),
            issuers,
            audience: audience.into(),
            cache: Arc::new(RwLock::new(KeyCache::default())),
        }
    }

    /// Tokens from Google Sign-In, issued to the given OAuth client id.
    pub fn google(client_id: impl Into<String>) -> Self {
        Self::new(
            GOOGLE_JWKS_URL,
            vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            client_id,
        )
    }

    /// Firebase Authentication tokens for the given project.
    pub fn firebase(project_id: &str) -> Self {
        Self::new(
            FIREBASE_JWKS_URL,
            vec![format!("https://securetoken.google.com/{}", project_id)],
            project_id,
        )
    }

    async fn fetch_keys(&self) -> Result<JwkSet, IdentityError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::KeysUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::KeysUnavailable(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::KeysUnavailable(e.to_string()))
    }

    /// Find the decoding key for `kid`, refreshing the cache when it is stale
    /// or does not know the key and no fetch was attempted recently.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        {
            let cache = self.cache.read().await;
            if !cache.should_refresh(kid) {
                return cache.lookup(kid);
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if !cache.should_refresh(kid) {
            return cache.lookup(kid);
        }

        cache.last_attempt = Some(Instant::now());
        match self.fetch_keys().await {
            Ok(keys) => {
                cache.keys = Some(keys);
                cache.fetched_at = Some(Instant::now());
            }
            Err(e) if cache.keys.is_none() => return Err(e),
            Err(e) => tracing::warn!("Keeping stale signing keys: {}", e),
        }

        cache.lookup(kid)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&self.issuers[..]);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for JwksIdTokenVerifier {
    async fn verify(&self, identity_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header =
            decode_header(identity_token).map_err(|e| IdentityError::Rejected(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Rejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Rejected("token has no key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let data = decode::<IdTokenClaims>(identity_token, &key, &self.validation())
            .map_err(|e| IdentityError::Rejected(e.to_string()))?;

        Ok(VerifiedIdentity {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: u64,
    }

    // None of these reach the network: they fail while reading the header.

    #[tokio::test]
    async fn garbage_is_rejected() {
        let verifier = JwksIdTokenVerifier::google("client");
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(IdentityError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn symmetric_tokens_are_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "u".to_string(),
                exp: 4_000_000_000,
            },
            &EncodingKey::from_secret(b"shared"),
        )
        .unwrap();

        let verifier = JwksIdTokenVerifier::firebase("demo-project");
        match verifier.verify(&token).await {
            Err(IdentityError::Rejected(msg)) => assert!(msg.contains("algorithm")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn firebase_verifier_expects_project_issuer() {
        let verifier = JwksIdTokenVerifier::firebase("demo-project");
        assert_eq!(
            verifier.issuers,
            vec!["https://securetoken.google.com/demo-project".to_string()]
        );
        assert_eq!(verifier.audience, "demo-project");
    }

    // =========================================================================
    // KEY REFRESH
    // =========================================================================

    /// Serve a key endpoint that answers every fetch with `status` and an
    /// empty key set, counting the fetches.
    async fn counting_key_endpoint(status: StatusCode) -> (String, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let app = Router::new().route(
            "/certs",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, r#"{"keys":[]}"#)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/certs", addr), fetches)
    }

    /// An RS256 token naming `kid`. The header is all that is read before the
    /// key lookup, so the signature is a placeholder.
    fn token_with_kid(kid: &str) -> String {
        let header = serde_json::json!({ "alg": "RS256", "kid": kid, "typ": "JWT" });
        format!("{}.e30.sig", URL_SAFE_NO_PAD.encode(header.to_string()))
    }

    fn verifier_for(jwks_url: &str) -> JwksIdTokenVerifier {
        JwksIdTokenVerifier::new(jwks_url, vec!["issuer".to_string()], "audience")
    }

    #[tokio::test]
    async fn unknown_key_ids_do_not_refetch_within_the_interval() {
        let (url, fetches) = counting_key_endpoint(StatusCode::OK).await;
        let verifier = verifier_for(&url);

        for kid in ["k1", "k2", "k3"] {
            match verifier.verify(&token_with_kid(kid)).await {
                Err(IdentityError::Rejected(msg)) => assert!(msg.contains(kid)),
                other => panic!("unexpected result: {other:?}"),
            }
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_retried_within_the_interval() {
        let (url, fetches) = counting_key_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
        let verifier = verifier_for(&url);

        for kid in ["k1", "k2"] {
            assert!(matches!(
                verifier.verify(&token_with_kid(kid)).await,
                Err(IdentityError::KeysUnavailable(_))
            ));
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_cache_refetches_once_the_interval_has_passed() {
        let (url, fetches) = counting_key_endpoint(StatusCode::OK).await;
        let verifier = verifier_for(&url);
        let _ = verifier.verify(&token_with_kid("k1")).await;

        {
            let mut cache = verifier.cache.write().await;
            let long_ago = Instant::now().checked_sub(KEY_CACHE_TTL + MIN_REFRESH_INTERVAL);
            cache.fetched_at = long_ago;
            cache.last_attempt = long_ago;
        }
        let _ = verifier.verify(&token_with_kid("k1")).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
