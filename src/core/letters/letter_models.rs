// Domain models for letters.
// A letter is a Google Doc seen through its plain-text export. Drive owns the
// canonical copy; nothing here is cached between calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a letter is created without one.
pub const DEFAULT_LETTER_TITLE: &str = "Untitled Letter";

/// One entry of the letter listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterSummary {
    pub id: String,
    pub name: String,
    /// Assigned by Drive on every write.
    pub modified_time: Option<DateTime<Utc>>,
}

/// The exported plain-text body of a letter.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterContent {
    pub id: String,
    pub content: String,
}

/// A save request as the gateway receives it.
///
/// `id` decides between create and update: absent means create, present means
/// update in place. There is no existence lookup against Drive.
#[derive(Debug, Clone, Default)]
pub struct SaveLetterRequest {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLetter {
    pub file_id: String,
    pub created: bool,
}
