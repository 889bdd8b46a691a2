pub mod letter_editor;
pub mod letter_models;
pub mod letter_service;

pub use letter_editor::LetterDraft;
pub use letter_models::{LetterContent, LetterSummary, SaveLetterRequest, SavedLetter};
pub use letter_service::{DriveBackend, DriveError, LetterError, LetterService};
