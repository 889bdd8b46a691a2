// This is the letters module - the business logic behind the gateway endpoints.
// It knows nothing about HTTP or about Google's REST shapes. The gateway hands
// it the caller's access token and the Drive backend does the actual work.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::letter_models::{
    LetterContent, LetterSummary, SaveLetterRequest, SavedLetter, DEFAULT_LETTER_TITLE,
};

// ============================================================================
// ERRORS
// ============================================================================

/// Failures reported by a Drive backend.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Drive refused the access token (expired, revoked or malformed).
    #[error("Drive rejected the access token")]
    Unauthorized,

    #[error("Drive document not found: {0}")]
    NotFound(String),

    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Drive transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by the letter operations.
///
/// Each variant maps onto exactly one class of gateway response, so callers
/// can tell a missing token from an expired one from everything else.
#[derive(Debug, Error)]
pub enum LetterError {
    #[error("Google Drive access token is required")]
    MissingToken,

    #[error("Google Drive authentication failed")]
    Authentication,

    #[error("Drive request failed: {0}")]
    Upstream(DriveError),
}

impl From<DriveError> for LetterError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Unauthorized => LetterError::Authentication,
            other => LetterError::Upstream(other),
        }
    }
}

// ============================================================================
// DRIVE BACKEND TRAIT (PORT)
// ============================================================================

/// The three Drive operations the application uses.
///
/// Every call carries the caller's access token; implementations hold no
/// per-user state.
#[async_trait]
pub trait DriveBackend: Send + Sync {
    /// List the Google Docs visible to the token.
    async fn list_documents(&self, access_token: &str) -> Result<Vec<LetterSummary>, DriveError>;

    /// Export a document as plain text.
    async fn export_text(&self, access_token: &str, file_id: &str) -> Result<String, DriveError>;

    /// Create a new Google Doc and return its id.
    async fn create_document(
        &self,
        access_token: &str,
        title: &str,
        content: &str,
    ) -> Result<String, DriveError>;

    /// Replace the content of an existing document. The name is left alone.
    async fn update_document(
        &self,
        access_token: &str,
        file_id: &str,
        content: &str,
    ) -> Result<(), DriveError>;
}

// Blanket implementation for shared backends, so the gateway state can hold an
// `Arc<dyn DriveBackend>` and pick the implementation at startup.
#[async_trait]
impl<T: DriveBackend + ?Sized> DriveBackend for Arc<T> {
    async fn list_documents(&self, access_token: &str) -> Result<Vec<LetterSummary>, DriveError> {
        (**self).list_documents(access_token).await
    }

    async fn export_text(&self, access_token: &str, file_id: &str) -> Result<String, DriveError> {
        (**self).export_text(access_token, file_id).await
    }

    async fn create_document(
        &self,
        access_token: &str,
        title: &str,
        content: &str,
    ) -> Result<String, DriveError> {
        (**self).create_document(access_token, title, content).await
    }

    async fn update_document(
        &self,
        access_token: &str,
        file_id: &str,
        content: &str,
    ) -> Result<(), DriveError> {
        (**self).update_document(access_token, file_id, content).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Stateless letter operations on top of a Drive backend.
pub struct LetterService<D: DriveBackend> {
    drive: D,
}

impl<D: DriveBackend> LetterService<D> {
    pub fn new(drive: D) -> Self {
        Self { drive }
    }

    /// An empty token counts as no token at all.
    fn require_token(access_token: Option<&str>) -> Result<&str, LetterError> {
        access_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(LetterError::MissingToken)
    }

    pub async fn list_letters(
        &self,
        access_token: Option<&str>,
    ) -> Result<Vec<LetterSummary>, LetterError> {
        let token = Self::require_token(access_token)?;
        let letters = self.drive.list_documents(token).await?;
        tracing::debug!(count = letters.len(), "Listed letters");
        Ok(letters)
    }

    pub async fn get_letter(
        &self,
        id: &str,
        access_token: Option<&str>,
    ) -> Result<LetterContent, LetterError> {
        let token = Self::require_token(access_token)?;
        let content = self.drive.export_text(token, id).await?;
        Ok(LetterContent {
            id: id.to_string(),
            content,
        })
    }

    /// Create or update a letter.
    ///
    /// The branch is taken on the presence of `request.id` alone:
    /// - no id: create a document named after `title` and return the new id
    /// - id: overwrite that document's content and return the same id
    pub async fn save_letter(
        &self,
        access_token: Option<&str>,
        request: SaveLetterRequest,
    ) -> Result<SavedLetter, LetterError> {
        let token = Self::require_token(access_token)?;

        match request.id.filter(|id| !id.is_empty()) {
            Some(file_id) => {
                tracing::info!(file_id = %file_id, "Updating existing letter");
                self.drive
                    .update_document(token, &file_id, &request.content)
                    .await?;
                Ok(SavedLetter {
                    file_id,
                    created: false,
                })
            }
            None => {
                let title = match request.title.trim() {
                    "" => DEFAULT_LETTER_TITLE,
                    title => title,
                };
                tracing::info!(title = %title, "Creating new letter");
                let file_id = self
                    .drive
                    .create_document(token, title, &request.content)
                    .await?;
                tracing::info!(file_id = %file_id, "Created letter");
                Ok(SavedLetter {
                    file_id,
                    created: true,
                })
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
