// =============================================================================
// GATEWAY CLIENT
// =============================================================================
//
// The client side of the letter API. It sends the session's tokens with every
// call: the Drive access token as `accessToken` (query or body) and the identity
// token as an `Authorization: Bearer` header.
//
// Gateway error bodies (`{ "error": ... }`) are turned back into typed errors by
// status: 400 is a missing token, 401 an expired/revoked one, anything else an
// upstream failure.

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::letters::{LetterContent, LetterDraft, LetterSummary, SavedLetter};
use crate::core::session::Session;
use crate::web::api_types::{
    ErrorBody, LetterResponse, LettersResponse, SaveLetterBody, SaveLetterResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    MissingToken(String),

    #[error("{0}")]
    Authentication(String),

    #[error("Gateway error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Could not reach the letter service: {0}")]
    Network(String),

    #[error("Unexpected response from the letter service: {0}")]
    InvalidResponse(String),

    #[error("Invalid letter service URL: {0}")]
    InvalidUrl(String),
}

pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl GatewayClient {
    /// `base_url` points at the gateway's `/api` root.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(request: RequestBuilder, session: &Session) -> RequestBuilder {
        request.bearer_auth(&session.identity_token)
    }

    fn with_token(request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.access_token.as_deref() {
            Some(token) => request.query(&[("accessToken", token)]),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        Err(match status {
            StatusCode::BAD_REQUEST => ClientError::MissingToken(message),
            StatusCode::UNAUTHORIZED => ClientError::Authentication(message),
            other => ClientError::Upstream {
                status: other.as_u16(),
                message,
            },
        })
    }

    pub async fn list_letters(&self, session: &Session) -> Result<Vec<LetterSummary>, ClientError> {
        let url = self.endpoint(&["letters"])?;
        let request = Self::with_token(Self::authorized(self.http.get(url), session), session);
        let response = request.send().await.map_err(network)?;

        let body: LettersResponse = Self::read(response).await?;
        Ok(body.letters)
    }

    pub async fn get_letter(&self, session: &Session, id: &str) -> Result<LetterContent, ClientError> {
        let url = self.endpoint(&["letter", id])?;
        let request = Self::with_token(Self::authorized(self.http.get(url), session), session);
        let response = request.send().await.map_err(network)?;

        let body: LetterResponse = Self::read(response).await?;
        Ok(LetterContent {
            id: body.file_id,
            content: body.content,
        })
    }

    /// Save a draft. A draft with an id updates that document; one without
    /// creates a new document.
    pub async fn save_letter(
        &self,
        session: &Session,
        draft: &LetterDraft,
    ) -> Result<SavedLetter, ClientError> {
        let url = self.endpoint(&["save-letter"])?;
        let body = SaveLetterBody {
            content: draft.content.clone(),
            title: draft.title.clone(),
            file_id: draft.id.clone(),
            access_token: session.access_token.clone(),
        };

        let response = Self::authorized(self.http.post(url), session)
            .json(&body)
            .send()
            .await
            .map_err(network)?;

        let saved: SaveLetterResponse = Self::read(response).await?;
        Ok(SavedLetter {
            created: draft.is_new(),
            file_id: saved.file_id,
        })
    }
}

fn network(e: reqwest::Error) -> ClientError {
    ClientError::Network(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Identity;
    use crate::infra::drive::InMemoryDriveBackend;
    use crate::web::server::spawn_for_tests;
    use std::sync::Arc;

    fn session(access_token: Option<&str>) -> Session {
        Session {
            identity: Identity {
                user_id: "user-1".to_string(),
                email: None,
                display_name: None,
            },
            identity_token: "header.payload.sig".to_string(),
            access_token: access_token.map(str::to_string),
        }
    }

    #[test]
    fn endpoints_keep_the_api_prefix_and_escape_ids() {
        let client = GatewayClient::new("http://localhost:5000/api").unwrap();
        assert_eq!(
            client.endpoint(&["letter", "a/b c"]).unwrap().as_str(),
            "http://localhost:5000/api/letter/a%2Fb%20c"
        );
        assert_eq!(
            client.endpoint(&["letters"]).unwrap().as_str(),
            "http://localhost:5000/api/letters"
        );
    }

    #[test]
    fn malformed_base_urls_are_invalid_urls() {
        assert!(matches!(
            GatewayClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));

        let client = GatewayClient::new("mailto:letters@example.com").unwrap();
        assert!(matches!(
            client.endpoint(&["letters"]),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn save_then_open_round_trips_through_the_gateway() {
        let drive = Arc::new(InMemoryDriveBackend::new());
        let base = spawn_for_tests(drive.clone()).await;
        let client = GatewayClient::new(&base).unwrap();
        let session = session(Some("token-a"));

        let mut draft = LetterDraft::new("Dear Sir,\nThanks.");
        draft.title = "Dear Sir,".to_string();
        let saved = client.save_letter(&session, &draft).await.unwrap();
        assert!(saved.created);

        let letter = client.get_letter(&session, &saved.file_id).await.unwrap();
        assert_eq!(letter.id, saved.file_id);
        assert_eq!(letter.content, "Dear Sir,\nThanks.");

        let letters = client.list_letters(&session).await.unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].name, "Dear Sir,");
    }

    #[tokio::test]
    async fn missing_access_token_comes_back_as_missing_token() {
        let base = spawn_for_tests(Arc::new(InMemoryDriveBackend::new())).await;
        let client = GatewayClient::new(&base).unwrap();

        match client.list_letters(&session(None)).await {
            Err(ClientError::MissingToken(msg)) => {
                assert_eq!(msg, "Google Drive access token is required")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn revoked_token_comes_back_as_authentication_error() {
        let drive = Arc::new(InMemoryDriveBackend::new());
        drive.revoke_token("stale");
        let base = spawn_for_tests(drive).await;
        let client = GatewayClient::new(&base).unwrap();

        assert!(matches!(
            client.list_letters(&session(Some("stale"))).await,
            Err(ClientError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_network_error() {
        // Port 9 (discard) is essentially never listening on loopback.
        let client = GatewayClient::new("http://127.0.0.1:9/api").unwrap();
        assert!(matches!(
            client.list_letters(&session(Some("t"))).await,
            Err(ClientError::Network(_))
        ));
    }
}
