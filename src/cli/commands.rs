// =============================================================================
// CLIENT COMMANDS
// =============================================================================
//
// The command-line client: sign in with Google, then list, open and save
// letters through the gateway. Every command returns a `CommandOutput` rather
// than failing, so a bad network day ends in a message and a non-zero exit
// code, not a panic.

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use super::views::{self, Action, MISSING_ACCESS_TOKEN_MESSAGE, NOT_SIGNED_IN_MESSAGE};
use crate::core::letters::LetterDraft;
use crate::core::session::{AuthError, IdentityProvider, Session, SessionService, TokenStore};
use crate::infra::gateway::GatewayClient;

#[derive(Debug, Parser)]
#[command(name = "letter-editor", version, about = "Write letters and keep them in Google Drive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP gateway in front of Google Drive
    Serve(ServeArgs),

    #[command(flatten)]
    Client(ClientCommand),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Keep letters in memory instead of Google Drive
    #[arg(long)]
    pub memory_drive: bool,
}

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Sign in with Google and remember the session
    Login,
    /// Sign out and forget the stored tokens
    Logout,
    /// Show who is signed in
    Whoami,
    /// List your letters
    List,
    /// Show a letter
    Open {
        id: String,
        /// Write the letter's text to this file instead of the terminal
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Save a letter from a text file (creates one unless --id is given)
    Save {
        #[arg(long, short)]
        file: PathBuf,
        #[arg(long, short)]
        title: Option<String>,
        /// Update this letter instead of creating a new one
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}

pub struct LetterClient<S: TokenStore, P: IdentityProvider> {
    session: SessionService<S, P>,
    gateway: GatewayClient,
    timezone: Tz,
}

impl<S: TokenStore, P: IdentityProvider> LetterClient<S, P> {
    pub fn new(session: SessionService<S, P>, gateway: GatewayClient, timezone: Tz) -> Self {
        Self {
            session,
            gateway,
            timezone,
        }
    }

    /// Pick up the session persisted by an earlier run.
    pub async fn restore(&self) -> Result<(), AuthError> {
        if let Some(session) = self.session.restore_session().await? {
            tracing::debug!(user_id = %session.identity.user_id, "Restored session");
        }
        Ok(())
    }

    pub async fn execute(&self, command: ClientCommand) -> CommandOutput {
        match command {
            ClientCommand::Login => self.login().await,
            ClientCommand::Logout => self.logout().await,
            ClientCommand::Whoami => self.whoami().await,
            ClientCommand::List => self.list().await,
            ClientCommand::Open { id, output } => self.open(&id, output.as_deref()).await,
            ClientCommand::Save { file, title, id } => {
                match tokio::fs::read_to_string(&file).await {
                    Ok(content) => self.save(content, title, id).await,
                    Err(e) => CommandOutput::failed(format!(
                        "Could not read {}: {}",
                        file.display(),
                        e
                    )),
                }
            }
        }
    }

    pub async fn login(&self) -> CommandOutput {
        match self.session.sign_in().await {
            Ok(identity) => CommandOutput::ok(format!("Signed in as {}", identity.label())),
            Err(AuthError::Cancelled) => CommandOutput::failed("Sign-in was cancelled."),
            Err(e) => {
                tracing::warn!("Sign-in failed: {}", e);
                CommandOutput::failed(format!("Sign-in failed: {}", e))
            }
        }
    }

    pub async fn logout(&self) -> CommandOutput {
        match self.session.sign_out().await {
            Ok(()) => CommandOutput::ok("Signed out."),
            Err(e) => CommandOutput::failed(format!("Could not clear the stored session: {}", e)),
        }
    }

    pub async fn whoami(&self) -> CommandOutput {
        let Some(session) = self.session.current().await else {
            return CommandOutput::ok("Not signed in.");
        };

        let mut text = format!("Signed in as {}", session.identity.label());
        if let Some(email) = &session.identity.email {
            if session.identity.display_name.is_some() {
                text.push_str(&format!(" <{}>", email));
            }
        }
        if session.access_token.is_none() {
            text.push('\n');
            text.push_str(MISSING_ACCESS_TOKEN_MESSAGE);
        }
        CommandOutput::ok(text)
    }

    pub async fn list(&self) -> CommandOutput {
        let Some(session) = self.session.current().await else {
            return CommandOutput::failed(NOT_SIGNED_IN_MESSAGE);
        };

        match self.gateway.list_letters(&session).await {
            Ok(letters) => CommandOutput::ok(views::render_letter_list(&letters, self.timezone)),
            Err(e) => CommandOutput::failed(views::error_message(Action::List, &e)),
        }
    }

    pub async fn open(&self, id: &str, output: Option<&Path>) -> CommandOutput {
        let Some(session) = self.session.current().await else {
            return CommandOutput::failed(NOT_SIGNED_IN_MESSAGE);
        };

        let letter = match self.gateway.get_letter(&session, id).await {
            Ok(letter) => letter,
            Err(e) => return CommandOutput::failed(views::error_message(Action::Open, &e)),
        };
        let draft = LetterDraft::loaded(letter.id, letter.content);

        match output {
            Some(path) => match tokio::fs::write(path, &draft.content).await {
                Ok(()) => CommandOutput::ok(format!(
                    "Wrote \"{}\" to {}",
                    draft.title,
                    path.display()
                )),
                Err(e) => CommandOutput::failed(format!("Could not write {}: {}", path.display(), e)),
            },
            None => CommandOutput::ok(views::render_draft(&draft)),
        }
    }

    pub async fn save(
        &self,
        content: String,
        title: Option<String>,
        id: Option<String>,
    ) -> CommandOutput {
        let Some(session) = self.session.current().await else {
            return CommandOutput::failed(NOT_SIGNED_IN_MESSAGE);
        };
        if !has_access_token(&session) {
            return CommandOutput::failed(MISSING_ACCESS_TOKEN_MESSAGE);
        }

        let mut draft = match id {
            Some(id) => LetterDraft::loaded(id, content),
            None => LetterDraft::new(content),
        }
        .with_title(title);

        match self.gateway.save_letter(&session, &draft).await {
            Ok(saved) => {
                draft.mark_saved(&saved.file_id);
                CommandOutput::ok(views::render_saved(&draft, saved.created))
            }
            Err(e) => CommandOutput::failed(views::error_message(Action::Save, &e)),
        }
    }
}

fn has_access_token(session: &Session) -> bool {
    session
        .access_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::letters::DriveBackend;
    use crate::core::session::session_models::unsigned_identity_token;
    use crate::core::session::{ProviderCredentials, ACCESS_TOKEN_KEY, IDENTITY_TOKEN_KEY};
    use crate::infra::drive::InMemoryDriveBackend;
    use crate::infra::session::InMemoryTokenStore;
    use crate::web::server::spawn_for_tests;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FakeGoogle {
        access_token: &'static str,
    }

    #[async_trait]
    impl IdentityProvider for FakeGoogle {
        async fn sign_in(&self) -> Result<ProviderCredentials, AuthError> {
            Ok(ProviderCredentials {
                identity_token: unsigned_identity_token("user-1", Some("writer@example.com")),
                access_token: self.access_token.to_string(),
            })
        }

        async fn sign_out(&self, _access_token: Option<&str>) -> Result<(), AuthError> {
            Ok(())
        }
    }

    struct Harness {
        client: LetterClient<Arc<InMemoryTokenStore>, FakeGoogle>,
        store: Arc<InMemoryTokenStore>,
        drive: Arc<InMemoryDriveBackend>,
    }

    async fn harness_with(store: Arc<InMemoryTokenStore>, access_token: &'static str) -> Harness {
        let drive = Arc::new(InMemoryDriveBackend::new());
        drive.revoke_token("revoked");
        let base = spawn_for_tests(drive.clone()).await;

        let session = SessionService::new(store.clone(), FakeGoogle { access_token });
        let client = LetterClient::new(session, GatewayClient::new(&base).unwrap(), chrono_tz::UTC);
        client.restore().await.unwrap();

        Harness {
            client,
            store,
            drive,
        }
    }

    async fn signed_in(access_token: &'static str) -> Harness {
        let h = harness_with(Arc::new(InMemoryTokenStore::new()), access_token).await;
        assert!(h.client.login().await.success);
        h
    }

    #[tokio::test]
    async fn login_persists_tokens_and_reports_identity() {
        let h = harness_with(Arc::new(InMemoryTokenStore::new()), "tok").await;

        let out = h.client.login().await;

        assert_eq!(out, CommandOutput::ok("Signed in as writer@example.com"));
        assert!(h.store.get(IDENTITY_TOKEN_KEY).await.unwrap().is_some());
        assert_eq!(
            h.store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
            Some("tok")
        );
    }

    #[tokio::test]
    async fn empty_listing_shows_prompt() {
        let h = signed_in("tok").await;

        let out = h.client.list().await;

        assert!(out.success);
        assert_eq!(out.text, views::EMPTY_LIST_MESSAGE);
    }

    #[tokio::test]
    async fn first_save_creates_and_later_saves_update() {
        let h = signed_in("tok").await;

        let created = h
            .client
            .save("Dear Sir,\nFirst.".to_string(), Some("To the bank".to_string()), None)
            .await;
        assert!(created.success, "{}", created.text);
        assert!(created.text.contains("\"To the bank\""));

        let letters = h.drive.list_documents("tok").await.unwrap();
        assert_eq!(letters.len(), 1);
        let id = letters[0].id.clone();

        let updated = h
            .client
            .save("Dear Sir,\nSecond.".to_string(), None, Some(id.clone()))
            .await;
        assert!(updated.success);
        assert_eq!(updated.text, format!("Letter saved successfully (id: {})", id));
        assert_eq!(h.drive.list_documents("tok").await.unwrap().len(), 1);

        let opened = h.client.open(&id, None).await;
        assert!(opened.success);
        assert!(opened.text.starts_with("Dear Sir,\n"));
        assert!(opened.text.ends_with("Dear Sir,\nSecond."));
    }

    #[tokio::test]
    async fn new_letters_without_title_get_the_default() {
        let h = signed_in("tok").await;

        let out = h.client.save("Hello".to_string(), None, None).await;

        assert!(out.text.contains("\"Untitled Letter\""));
        assert_eq!(
            h.drive.list_documents("tok").await.unwrap()[0].name,
            "Untitled Letter"
        );
    }

    #[tokio::test]
    async fn save_without_access_token_never_reaches_the_gateway() {
        let store = Arc::new(InMemoryTokenStore::new());
        store
            .set(IDENTITY_TOKEN_KEY, &unsigned_identity_token("user-1", None))
            .await
            .unwrap();
        let h = harness_with(store, "tok").await;

        let out = h.client.save("text".to_string(), None, None).await;

        assert_eq!(out, CommandOutput::failed(MISSING_ACCESS_TOKEN_MESSAGE));
        assert!(h.drive.list_documents("tok").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commands_need_a_session() {
        let h = harness_with(Arc::new(InMemoryTokenStore::new()), "tok").await;

        assert_eq!(h.client.list().await, CommandOutput::failed(NOT_SIGNED_IN_MESSAGE));
        assert_eq!(h.client.whoami().await, CommandOutput::ok("Not signed in."));
    }

    #[tokio::test]
    async fn expired_access_token_asks_to_sign_in_again() {
        let h = signed_in("revoked").await;

        let out = h.client.list().await;

        assert!(!out.success);
        assert!(out.text.contains("log out and log in again"));
    }

    #[tokio::test]
    async fn missing_letter_is_a_retryable_error() {
        let h = signed_in("tok").await;

        let out = h.client.open("does-not-exist", None).await;

        assert_eq!(
            out,
            CommandOutput::failed("Failed to load the letter. Please try again.")
        );
    }

    #[tokio::test]
    async fn open_can_write_to_a_file() {
        let h = signed_in("tok").await;
        let id = h.drive.create_document("tok", "Note", "Body text").await.unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("letter.txt");

        let out = h.client.open(&id, Some(path.as_path())).await;

        assert!(out.success);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Body text");
    }

    #[tokio::test]
    async fn logout_clears_the_store() {
        let h = signed_in("tok").await;

        assert_eq!(h.client.logout().await, CommandOutput::ok("Signed out."));
        assert!(h.store.is_empty());
        assert_eq!(h.client.whoami().await.text, "Not signed in.");
    }

    #[test]
    fn cli_parses_client_and_server_commands() {
        let cli = Cli::try_parse_from(["letter-editor", "save", "--file", "a.txt", "--id", "1x"])
            .unwrap();
        match cli.command {
            Command::Client(ClientCommand::Save { file, title, id }) => {
                assert_eq!(file, PathBuf::from("a.txt"));
                assert_eq!(title, None);
                assert_eq!(id.as_deref(), Some("1x"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["letter-editor", "serve", "--port", "8080", "--memory-drive"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve(ServeArgs {
                port: Some(8080),
                memory_drive: true,
                ..
            })
        ));
    }
}
