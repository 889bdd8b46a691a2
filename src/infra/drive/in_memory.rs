// In-memory implementation of DriveBackend.
//
// Used by `serve --memory-drive` for local development and by the tests. It
// behaves like Drive where it matters to the gateway: ids are assigned on
// create, updates keep the id and the name, and revoked tokens get a 401.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::core::letters::{DriveBackend, DriveError, LetterSummary};

#[derive(Clone, Debug)]
struct StoredDocument {
    name: String,
    content: String,
    modified_time: DateTime<Utc>,
}

pub struct InMemoryDriveBackend {
    /// Maps file id -> document
    documents: DashMap<String, StoredDocument>,
    revoked_tokens: DashSet<String>,
}

impl InMemoryDriveBackend {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            revoked_tokens: DashSet::new(),
        }
    }

    /// Make every later call with `token` fail as unauthorized.
    pub fn revoke_token(&self, token: &str) {
        self.revoked_tokens.insert(token.to_string());
    }

    /// Drive-style opaque id.
    fn new_file_id() -> String {
        let body: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        format!("1{}", body)
    }

    fn authorize(&self, token: &str) -> Result<(), DriveError> {
        if self.revoked_tokens.contains(token) {
            Err(DriveError::Unauthorized)
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryDriveBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveBackend for InMemoryDriveBackend {
    async fn list_documents(&self, access_token: &str) -> Result<Vec<LetterSummary>, DriveError> {
        self.authorize(access_token)?;

        let mut letters: Vec<LetterSummary> = self
            .documents
            .iter()
            .map(|entry| LetterSummary {
                id: entry.key().clone(),
                name: entry.value().name.clone(),
                modified_time: Some(entry.value().modified_time),
            })
            .collect();

        // Newest first, like the Drive listing
        letters.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
        Ok(letters)
    }

    async fn export_text(&self, access_token: &str, file_id: &str) -> Result<String, DriveError> {
        self.authorize(access_token)?;

        self.documents
            .get(file_id)
            .map(|doc| doc.content.clone())
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))
    }

    async fn create_document(
        &self,
        access_token: &str,
        title: &str,
        content: &str,
    ) -> Result<String, DriveError> {
        self.authorize(access_token)?;

        let id = Self::new_file_id();
        self.documents.insert(
            id.clone(),
            StoredDocument {
                name: title.to_string(),
                content: content.to_string(),
                modified_time: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_document(
        &self,
        access_token: &str,
        file_id: &str,
        content: &str,
    ) -> Result<(), DriveError> {
        self.authorize(access_token)?;

        let mut doc = self
            .documents
            .get_mut(file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;
        doc.content = content.to_string();
        doc.modified_time = Utc::now();
        Ok(())
    }
}
