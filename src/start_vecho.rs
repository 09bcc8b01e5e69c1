//! Startup for the Vecho server: logging, configuration, storage, serving.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::GeminiBackend;
use crate::server::{self, AppState};
use crate::storage::Database;

/// Run the server until Ctrl-C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Vecho v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env().and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    if config.upstream.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; upstream requests will be rejected");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Open storage, build state and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if storage, the HTTP client or the listener fail.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = initialize(&config).await?;
    server::run_server_with_shutdown(state, shutdown_signal()).await
}

/// Build application state without starting the server.
///
/// # Errors
/// Returns an error if the database or the HTTP client cannot be created.
pub async fn initialize(
    config: &AppConfig,
) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    let db = Database::open(&config.storage).await?;
    let backend = GeminiBackend::new(&config.upstream)?;
    tracing::info!(
        "Gemini endpoint: {}/{}",
        config.upstream.base_url,
        config.upstream.api_version
    );

    Ok(AppState::build(config, &db, Arc::new(backend)).await?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
