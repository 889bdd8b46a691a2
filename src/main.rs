// This is the entry point of the letter editor.
//
// **Architecture Overview:**
// - `core/` = Business logic (letters, session lifecycle, identity checks)
// - `infra/` = Implementations of core traits (Drive, token stores, Google OAuth)
// - `web/` = The HTTP gateway in front of Google Drive
// - `cli/` = The command-line client
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run either the gateway or one client command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "config/app_config.rs"]
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "web/web_layer.rs"]
mod web;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, ClientCommand, Command, LetterClient, ServeArgs, StdinCodeReceiver};
use crate::config::{AppConfig, ClientConfig, DriveBackendKind, GatewayConfig, IdentityCheck};
use crate::core::identity::IdentityVerifier;
use crate::core::letters::DriveBackend;
use crate::core::session::SessionService;
use crate::infra::drive::{GoogleDriveClient, InMemoryDriveBackend};
use crate::infra::gateway::GatewayClient;
use crate::infra::identity::{GoogleOAuthProvider, JwksIdTokenVerifier};
use crate::infra::session::SqliteTokenStore;
use crate::web::{AppState, GatewayServer};

const DEFAULT_LOG_FILTER: &str = "letter_editor=info,tower_http=info";

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    init_logging();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Serve(args) => serve(config.gateway, args).await,
        Command::Client(command) => {
            let success = run_client(config.client, command).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

// ============================================================================
// GATEWAY
// ============================================================================

async fn serve(mut config: GatewayConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.memory_drive {
        config.drive_backend = DriveBackendKind::Memory;
    }

    let drive: Arc<dyn DriveBackend> = match config.drive_backend {
        DriveBackendKind::Google => Arc::new(GoogleDriveClient::new(config.drive_api_base.clone())),
        DriveBackendKind::Memory => {
            tracing::warn!("Using the in-memory Drive backend; letters are lost on exit");
            Arc::new(InMemoryDriveBackend::new())
        }
    };

    let verifier: Option<Arc<dyn IdentityVerifier>> = match &config.identity_check {
        IdentityCheck::Google { audience } => {
            tracing::info!("Verifying Google identity tokens for audience {}", audience);
            Some(Arc::new(JwksIdTokenVerifier::google(audience.clone())))
        }
        IdentityCheck::Firebase { project_id } => {
            tracing::info!("Verifying Firebase identity tokens for project {}", project_id);
            Some(Arc::new(JwksIdTokenVerifier::firebase(project_id)))
        }
        IdentityCheck::Disabled => {
            tracing::info!("Identity token verification is disabled");
            None
        }
    };

    GatewayServer::new(config, AppState::new(drive, verifier))
        .run()
        .await
}

// ============================================================================
// CLIENT
// ============================================================================

async fn run_client(config: ClientConfig, command: ClientCommand) -> anyhow::Result<bool> {
    let store = SqliteTokenStore::new(&config.session_db_path)
        .await
        .with_context(|| format!("failed to open session store {}", config.session_db_path))?;
    let provider = GoogleOAuthProvider::new(config.oauth, StdinCodeReceiver);
    let gateway = GatewayClient::new(&config.api_url)?;

    let client = LetterClient::new(
        SessionService::new(store, provider),
        gateway,
        config.timezone,
    );
    client.restore().await?;

    let output = client.execute(command).await;
    if output.success {
        println!("{}", output.text);
    } else {
        eprintln!("{}", output.text);
    }
    Ok(output.success)
}
