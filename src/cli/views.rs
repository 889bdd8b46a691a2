// Text rendering for the client commands.
// Load and save failures become short, retryable messages; the detail goes to
// the log.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::core::letters::{LetterDraft, LetterSummary};
use crate::infra::gateway::ClientError;

pub const EMPTY_LIST_MESSAGE: &str =
    "You don't have any letters yet. Save one with `letter-editor save --file <FILE>`.";

pub const MISSING_ACCESS_TOKEN_MESSAGE: &str =
    "Google Drive access token is missing. Please log out and log in again.";

pub const NOT_SIGNED_IN_MESSAGE: &str = "You are not signed in. Run `letter-editor login` first.";

const AUTH_FAILED_MESSAGE: &str =
    "Authentication failed. Please log out and log in again to refresh your access token.";

const MODIFIED_TIME_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

/// Which user action failed; picks the message shown for non-auth failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Open,
    Save,
}

pub fn format_modified(time: Option<DateTime<Utc>>, timezone: Tz) -> String {
    match time {
        Some(time) => time
            .with_timezone(&timezone)
            .format(MODIFIED_TIME_FORMAT)
            .to_string(),
        None => "unknown".to_string(),
    }
}

pub fn render_letter_list(letters: &[LetterSummary], timezone: Tz) -> String {
    if letters.is_empty() {
        return EMPTY_LIST_MESSAGE.to_string();
    }

    let mut out = format!("Your letters ({}):\n", letters.len());
    for letter in letters {
        out.push_str(&format!(
            "\n  {}\n    id: {}\n    last modified: {}\n",
            letter.name,
            letter.id,
            format_modified(letter.modified_time, timezone)
        ));
    }
    out
}

pub fn render_draft(draft: &LetterDraft) -> String {
    let id = draft.id.as_deref().unwrap_or("(not saved yet)");
    format!(
        "{}\nid: {}\n{}\n{}",
        draft.title,
        id,
        "-".repeat(40),
        draft.content
    )
}

pub fn render_saved(draft: &LetterDraft, created: bool) -> String {
    let id = draft.id.as_deref().unwrap_or_default();
    if created {
        format!("Letter saved successfully as \"{}\" (id: {})", draft.title, id)
    } else {
        format!("Letter saved successfully (id: {})", id)
    }
}

pub fn error_message(action: Action, error: &ClientError) -> String {
    tracing::warn!(?action, "Request failed: {}", error);

    match error {
        ClientError::Authentication(_) => AUTH_FAILED_MESSAGE.to_string(),
        // The gateway says exactly which token is missing.
        ClientError::MissingToken(msg) => msg.clone(),
        _ => match action {
            Action::List => "Failed to load your letters. Please try again later.".to_string(),
            Action::Open => "Failed to load the letter. Please try again.".to_string(),
            Action::Save => "Failed to save the letter. Please try again.".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(name: &str, id: &str, time: Option<DateTime<Utc>>) -> LetterSummary {
        LetterSummary {
            id: id.to_string(),
            name: name.to_string(),
            modified_time: time,
        }
    }

    #[test]
    fn modified_time_uses_the_configured_timezone() {
        let time = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();

        assert_eq!(format_modified(Some(time), chrono_tz::UTC), "Mar 5, 2024, 02:07 PM");
        assert_eq!(
            format_modified(Some(time), chrono_tz::America::New_York),
            "Mar 5, 2024, 09:07 AM"
        );
        assert_eq!(format_modified(None, chrono_tz::UTC), "unknown");
    }

    #[test]
    fn empty_list_shows_prompt() {
        assert_eq!(render_letter_list(&[], chrono_tz::UTC), EMPTY_LIST_MESSAGE);
    }

    #[test]
    fn list_shows_every_letter() {
        let letters = vec![
            summary("Dear Sir,", "1a", None),
            summary("Cover letter", "1b", None),
        ];
        let out = render_letter_list(&letters, chrono_tz::UTC);

        assert!(out.starts_with("Your letters (2):"));
        assert!(out.contains("Dear Sir,") && out.contains("id: 1a"));
        assert!(out.contains("Cover letter") && out.contains("id: 1b"));
    }

    #[test]
    fn auth_failures_ask_to_sign_in_again() {
        let msg = error_message(Action::Open, &ClientError::Authentication("x".to_string()));
        assert!(msg.contains("log out and log in again"));
    }

    #[test]
    fn other_failures_are_generic_per_action() {
        let err = ClientError::Network("connection refused".to_string());
        assert_eq!(
            error_message(Action::List, &err),
            "Failed to load your letters. Please try again later."
        );
        assert_eq!(
            error_message(Action::Save, &err),
            "Failed to save the letter. Please try again."
        );
    }

    #[test]
    fn unsaved_draft_shows_placeholder_id() {
        let out = render_draft(&LetterDraft::new("Hello"));
        assert!(out.starts_with("Untitled Letter\nid: (not saved yet)"));
        assert!(out.ends_with("Hello"));
    }
}
