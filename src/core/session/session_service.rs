// Session lifecycle for the client.
//
// The session is an explicit object: it is initialised from the token store on
// startup, replaced on sign-in and cleared on sign-out. Nothing else writes to
// it. Commands get the current tokens from here and never touch the store.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::session_models::{
    Identity, ProviderCredentials, Session, ACCESS_TOKEN_KEY, IDENTITY_TOKEN_KEY,
};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Sign-in was denied: {0}")]
    Denied(String),

    #[error("Sign-in state did not match; start the sign-in again")]
    StateMismatch,

    #[error("Sign-in is not configured: {0}")]
    NotConfigured(String),

    #[error("Identity token is malformed: {0}")]
    MalformedToken(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Store(#[from] TokenStoreError),
}

// ============================================================================
// PORTS
// ============================================================================

/// Persistent key-value storage for the session tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError>;
    async fn remove(&self, key: &str) -> Result<(), TokenStoreError>;
}

/// The external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the provider's sign-in flow and return both tokens.
    async fn sign_in(&self) -> Result<ProviderCredentials, AuthError>;

    /// Tell the provider the session is over (e.g. revoke the access token).
    async fn sign_out(&self, access_token: Option<&str>) -> Result<(), AuthError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct SessionService<S: TokenStore, P: IdentityProvider> {
    store: S,
    provider: P,
    current: RwLock<Option<Session>>,
}

impl<S: TokenStore, P: IdentityProvider> SessionService<S, P> {
    /// Starts signed-out; call [`restore_session`](Self::restore_session) to
    /// pick up persisted tokens.
    pub fn new(store: S, provider: P) -> Self {
        Self {
            store,
            provider,
            current: RwLock::new(None),
        }
    }

    /// Rebuild the session from persisted tokens.
    ///
    /// Without an identity token the session is signed-out, and a leftover
    /// access token is dropped with it. An unreadable identity token is treated
    /// the same way.
    pub async fn restore_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(identity_token) = self.store.get(IDENTITY_TOKEN_KEY).await? else {
            self.store.remove(ACCESS_TOKEN_KEY).await?;
            *self.current.write().await = None;
            return Ok(None);
        };

        let identity = match Identity::from_identity_token(&identity_token) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Discarding unreadable persisted identity token: {}", e);
                self.clear_store().await?;
                *self.current.write().await = None;
                return Ok(None);
            }
        };

        let access_token = self.store.get(ACCESS_TOKEN_KEY).await?;
        if access_token.is_none() {
            tracing::debug!("Restored session has no Drive access token");
        }

        let session = Session {
            identity,
            identity_token,
            access_token,
        };
        *self.current.write().await = Some(session.clone());
        Ok(Some(session))
    }

    /// Sign in through the provider and persist both tokens. Either both are
    /// stored or neither is.
    pub async fn sign_in(&self) -> Result<Identity, AuthError> {
        let credentials = self.provider.sign_in().await?;
        let identity = Identity::from_identity_token(&credentials.identity_token)?;

        let mut persisted = self
            .store
            .set(IDENTITY_TOKEN_KEY, &credentials.identity_token)
            .await;
        if persisted.is_ok() {
            persisted = self
                .store
                .set(ACCESS_TOKEN_KEY, &credentials.access_token)
                .await;
        }
        if let Err(e) = persisted {
            if let Err(cleanup) = self.clear_store().await {
                tracing::warn!("Could not clear partially saved session: {}", cleanup);
            }
            return Err(e.into());
        }

        tracing::info!(user_id = %identity.user_id, "Signed in");

        *self.current.write().await = Some(Session {
            identity: identity.clone(),
            identity_token: credentials.identity_token,
            access_token: Some(credentials.access_token),
        });
        Ok(identity)
    }

    /// Sign out: clear both tokens locally, then tell the provider.
    ///
    /// The remote call is best-effort. Its failure is logged and the local
    /// sign-out still counts as done.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.current.write().await.take();
        let access_token = match previous.and_then(|s| s.access_token) {
            Some(token) => Some(token),
            None => self.store.get(ACCESS_TOKEN_KEY).await.ok().flatten(),
        };

        let cleared = self.clear_store().await;

        if let Err(e) = self.provider.sign_out(access_token.as_deref()).await {
            tracing::warn!("Remote sign-out failed: {}", e);
        }

        cleared?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Removes both keys even if the first removal fails.
    async fn clear_store(&self) -> Result<(), TokenStoreError> {
        let identity = self.store.remove(IDENTITY_TOKEN_KEY).await;
        let access = self.store.remove(ACCESS_TOKEN_KEY).await;
        identity.and(access)
    }
}

// ============================================================================
// TESTS
// ============================================================================
