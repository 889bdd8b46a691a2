// Editor state for a single letter.
// This is the client-side "view model": it holds what the user is editing and
// knows how the title is derived, but it never talks to the network itself.

use super::letter_models::DEFAULT_LETTER_TITLE;

/// Longest first line that is used as a title without truncation.
const MAX_TITLE_CHARS: usize = 50;

/// How many characters survive truncation before the ellipsis is appended.
const TRUNCATED_TITLE_CHARS: usize = 47;

/// Guess a title from the first line of a letter's content.
///
/// Returns `None` when the first line is blank. Drive's text export starts
/// with a byte-order mark, so it is stripped along with whitespace.
pub fn infer_title(content: &str) -> Option<String> {
    let first_line = content
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');

    if first_line.is_empty() {
        return None;
    }

    if first_line.chars().count() > MAX_TITLE_CHARS {
        let mut title: String = first_line.chars().take(TRUNCATED_TITLE_CHARS).collect();
        title.push_str("...");
        Some(title)
    } else {
        Some(first_line.to_string())
    }
}

/// A letter being edited.
///
/// `id` is `None` until the first successful save; after that every save is an
/// update of the same document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterDraft {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
}

impl LetterDraft {
    /// A brand-new letter with the default title.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: DEFAULT_LETTER_TITLE.to_string(),
            content: content.into(),
        }
    }

    /// A letter loaded from Drive. The title comes from the first line of the
    /// content when there is one.
    pub fn loaded(id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let title = infer_title(&content).unwrap_or_else(|| DEFAULT_LETTER_TITLE.to_string());
        Self {
            id: Some(id.into()),
            title,
            content,
        }
    }

    /// Override the title (an explicit title always wins over inference).
    pub fn with_title(mut self, title: Option<String>) -> Self {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.title = title;
        }
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Record the id Drive assigned. Only the first save of a new draft
    /// changes anything.
    pub fn mark_saved(&mut self, file_id: &str) {
        if self.id.is_none() {
            self.id = Some(file_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_line() {
        assert_eq!(
            infer_title("Dear Sir,\nI am writing..."),
            Some("Dear Sir,".to_string())
        );
    }

    #[test]
    fn long_first_line_is_truncated_with_ellipsis() {
        let line = "a".repeat(60);
        let title = infer_title(&line).unwrap();
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
        assert_eq!(&title[..47], &line[..47]);
    }

    #[test]
    fn fifty_character_line_is_kept_whole() {
        let line = "b".repeat(50);
        assert_eq!(infer_title(&line), Some(line));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let line = "é".repeat(55);
        let title = infer_title(&line).unwrap();
        assert_eq!(title, format!("{}...", "é".repeat(47)));
    }

    #[test]
    fn blank_first_line_gives_no_title() {
        assert_eq!(infer_title(""), None);
        assert_eq!(infer_title("   \nsecond line"), None);
    }

    #[test]
    fn export_bom_and_crlf_are_stripped() {
        assert_eq!(
            infer_title("\u{feff}To whom it may concern\r\nbody"),
            Some("To whom it may concern".to_string())
        );
    }

    #[test]
    fn loaded_draft_infers_title_unless_overridden() {
        let draft = LetterDraft::loaded("doc-1", "Hello there\nbody");
        assert_eq!(draft.title, "Hello there");
        assert!(!draft.is_new());

        let draft = draft.with_title(Some("Explicit".to_string()));
        assert_eq!(draft.title, "Explicit");

        let empty = LetterDraft::loaded("doc-2", "");
        assert_eq!(empty.title, DEFAULT_LETTER_TITLE);
    }

    #[test]
    fn new_draft_adopts_id_only_once() {
        let mut draft = LetterDraft::new("text");
        assert!(draft.is_new());
        assert_eq!(draft.title, DEFAULT_LETTER_TITLE);

        draft.mark_saved("first");
        draft.mark_saved("second");
        assert_eq!(draft.id.as_deref(), Some("first"));
    }
}
