// =============================================================================
// GOOGLE DRIVE CLIENT
// =============================================================================
//
// Implements the core `DriveBackend` trait against the Google Drive v3 REST
// API. It authenticates every call with the access token the user sent to the
// gateway, so the client itself holds no credentials.
//
// **Endpoints used:**
// - list:   GET   /drive/v3/files?q=mimeType='application/vnd.google-apps.document'
// - export: GET   /drive/v3/files/{id}/export?mimeType=text/plain
// - create: POST  /upload/drive/v3/files?uploadType=multipart
// - update: PATCH /upload/drive/v3/files/{id}?uploadType=media
//
// Creating uploads the text as `text/plain` with a Google Docs target mime
// type, which makes Drive convert it into a document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use crate::core::letters::{DriveBackend, DriveError, LetterSummary};

pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";

const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
const LIST_QUERY: &str = "mimeType='application/vnd.google-apps.document' and trashed=false";
const LIST_FIELDS: &str = "files(id, name, modifiedTime)";

// =============================================================================
// GOOGLE DRIVE API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<ApiFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: String,
    name: Option<String>,
    modified_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoogleDriveClient {
    client: Client,
    api_base: String,
}

impl GoogleDriveClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build `{api_base}/{segments...}`. Every segment is percent-encoded on
    /// its own, so `/`, `?` and `#` inside an id stay part of the id.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DriveError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| DriveError::Transport(format!("invalid Drive API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DriveError::Transport("Drive API base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Drive ids are URL-safe base64 characters. Anything else cannot name a
    /// document, so it is reported as missing without calling Drive.
    fn document_id(file_id: &str) -> Result<&str, DriveError> {
        let valid = !file_id.is_empty()
            && file_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(file_id)
        } else {
            tracing::warn!("Refusing malformed Drive file id: {:?}", file_id);
            Err(DriveError::NotFound(file_id.to_string()))
        }
    }

    fn parse_datetime(value: Option<String>) -> Option<DateTime<Utc>> {
        value
            .as_deref()
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn map_file(file: ApiFile) -> LetterSummary {
        LetterSummary {
            id: file.id,
            name: file.name.unwrap_or_else(|| "Untitled".to_string()),
            modified_time: Self::parse_datetime(file.modified_time),
        }
    }

    /// Turn a non-success response into a `DriveError`, keeping Google's
    /// message when the body carries one.
    fn error_for_status(status: StatusCode, body: &str, file_id: Option<&str>) -> DriveError {
        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized,
            StatusCode::NOT_FOUND => DriveError::NotFound(file_id.unwrap_or("").to_string()),
            _ => {
                let message = serde_json::from_str::<ApiErrorEnvelope>(body)
                    .map(|envelope| envelope.error.message)
                    .unwrap_or_else(|_| body.to_string());
                DriveError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    async fn check(response: Response, file_id: Option<&str>) -> Result<Response, DriveError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Self::error_for_status(status, &body, file_id))
    }

    fn new_boundary() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        format!("letter_boundary_{}", suffix)
    }

    /// Build a `multipart/related` body: JSON metadata first, then the text.
    fn multipart_body(boundary: &str, title: &str, content: &str) -> String {
        let metadata = serde_json::json!({
            "name": title,
            "mimeType": GOOGLE_DOC_MIME,
        });

        format!(
            "--{b}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{b}\r\n\
             Content-Type: text/plain; charset=UTF-8\r\n\r\n\
             {content}\r\n\
             --{b}--\r\n",
            b = boundary,
            metadata = metadata,
            content = content,
        )
    }
}

fn transport(e: reqwest::Error) -> DriveError {
    DriveError::Transport(e.to_string())
}

#[async_trait]
impl DriveBackend for GoogleDriveClient {
    async fn list_documents(&self, access_token: &str) -> Result<Vec<LetterSummary>, DriveError> {
        let url = self.endpoint(&["drive", "v3", "files"])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[
                ("q", LIST_QUERY),
                ("spaces", "drive"),
                ("fields", LIST_FIELDS),
                ("orderBy", "modifiedTime desc"),
            ])
            .send()
            .await
            .map_err(transport)?;

        let list: FileList = Self::check(response, None)
            .await?
            .json()
            .await
            .map_err(transport)?;

        Ok(list.files.into_iter().map(Self::map_file).collect())
    }

    async fn export_text(&self, access_token: &str, file_id: &str) -> Result<String, DriveError> {
        let file_id = Self::document_id(file_id)?;
        let url = self.endpoint(&["drive", "v3", "files", file_id, "export"])?;

        tracing::debug!("Exporting Google Doc as text: {}", file_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[("mimeType", "text/plain")])
            .send()
            .await
            .map_err(transport)?;

        Self::check(response, Some(file_id))
            .await?
            .text()
            .await
            .map_err(transport)
    }

    async fn create_document(
        &self,
        access_token: &str,
        title: &str,
        content: &str,
    ) -> Result<String, DriveError> {
        let url = self.endpoint(&["upload", "drive", "v3", "files"])?;
        let boundary = Self::new_boundary();

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(Self::multipart_body(&boundary, title, content))
            .send()
            .await
            .map_err(transport)?;

        let created: CreatedFile = Self::check(response, None)
            .await?
            .json()
            .await
            .map_err(transport)?;

        Ok(created.id)
    }

    async fn update_document(
        &self,
        access_token: &str,
        file_id: &str,
        content: &str,
    ) -> Result<(), DriveError> {
        let file_id = Self::document_id(file_id)?;
        let url = self.endpoint(&["upload", "drive", "v3", "files", file_id])?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(access_token)
            .query(&[("uploadType", "media")])
            .header("Content-Type", "text/plain; charset=UTF-8")
            .body(content.to_string())
            .send()
            .await
            .map_err(transport)?;

        Self::check(response, Some(file_id)).await?;
        Ok(())
    }
}

impl Default for GoogleDriveClient {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVE_API_BASE)
    }
}
