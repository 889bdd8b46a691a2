// Gateway server: binds the listener and serves the router until Ctrl-C.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use super::routes::create_app;
use super::state::AppState;
use crate::config::GatewayConfig;

pub struct GatewayServer {
    config: GatewayConfig,
    state: AppState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let address = self.config.address();
        let app = create_app(self.state, &self.config);

        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {}", address))?;

        info!("Letter gateway listening on http://{}", address);
        if let Some(dir) = &self.config.static_dir {
            info!("Serving the web app from {}", dir.display());
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("gateway server error")?;

        info!("Letter gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Serve an in-memory gateway on an ephemeral port and return its `/api` URL.
#[cfg(test)]
pub async fn spawn_for_tests(
    drive: std::sync::Arc<crate::infra::drive::InMemoryDriveBackend>,
) -> String {
    let drive: std::sync::Arc<dyn crate::core::letters::DriveBackend> = drive;
    let app = create_app(AppState::new(drive, None), &GatewayConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", address)
}
