// Advisory identity verification for the gateway.
//
// Access to Drive is authorised by the access token the caller sends with each
// request. The identity token only says who the caller claims to be, so its
// verification is informational: the outcome is logged and attached to the
// request, and a bad or missing token never stops the request.

use async_trait::async_trait;
use thiserror::Error;

/// Claims we trust after a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity token rejected: {0}")]
    Rejected(String),

    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, identity_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// What advisory verification concluded about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified(VerifiedIdentity),
    /// No bearer token was sent.
    Anonymous,
    /// A token was sent but no verifier is configured.
    Unchecked,
    /// Verification failed; the request still goes through.
    Failed(String),
}

impl VerificationOutcome {
    /// Short label for log fields.
    pub fn label(&self) -> String {
        match self {
            VerificationOutcome::Verified(identity) => identity.user_id.clone(),
            VerificationOutcome::Anonymous => "anonymous".to_string(),
            VerificationOutcome::Unchecked => "unchecked".to_string(),
            VerificationOutcome::Failed(_) => "unverified".to_string(),
        }
    }
}

/// Run verification without ever failing.
pub async fn verify_advisory(
    verifier: Option<&dyn IdentityVerifier>,
    bearer: Option<&str>,
) -> VerificationOutcome {
    let Some(token) = bearer.filter(|t| !t.is_empty()) else {
        tracing::debug!("No identity token provided");
        return VerificationOutcome::Anonymous;
    };

    let Some(verifier) = verifier else {
        return VerificationOutcome::Unchecked;
    };

    match verifier.verify(token).await {
        Ok(identity) => VerificationOutcome::Verified(identity),
        Err(e) => {
            tracing::warn!("Identity token verification failed, continuing: {}", e);
            VerificationOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVerifier {
        accept: bool,
    }

    #[async_trait]
    impl IdentityVerifier for FixedVerifier {
        async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
            if self.accept {
                Ok(VerifiedIdentity {
                    user_id: token.to_string(),
                    email: None,
                })
            } else {
                Err(IdentityError::Rejected("bad signature".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn missing_bearer_is_anonymous() {
        let verifier = FixedVerifier { accept: true };
        assert_eq!(
            verify_advisory(Some(&verifier), None).await,
            VerificationOutcome::Anonymous
        );
        assert_eq!(
            verify_advisory(Some(&verifier), Some("")).await,
            VerificationOutcome::Anonymous
        );
    }

    #[tokio::test]
    async fn token_without_verifier_is_unchecked() {
        assert_eq!(
            verify_advisory(None, Some("tok")).await,
            VerificationOutcome::Unchecked
        );
    }

    #[tokio::test]
    async fn rejection_becomes_an_outcome_not_an_error() {
        let verifier = FixedVerifier { accept: false };
        let outcome = verify_advisory(Some(&verifier), Some("tok")).await;
        assert!(matches!(outcome, VerificationOutcome::Failed(ref m) if m.contains("bad signature")));
        assert_eq!(outcome.label(), "unverified");
    }

    #[tokio::test]
    async fn accepted_token_is_verified() {
        let verifier = FixedVerifier { accept: true };
        let outcome = verify_advisory(Some(&verifier), Some("user-5")).await;
        assert_eq!(outcome.label(), "user-5");
    }
}
