use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use ohanami_core::SqliteReportStore;
use ohanami_core::config::{ENV_AUTH_TOKEN, SinkConfig};

mod dto;
mod error;
mod handlers;
mod security;

#[cfg(test)]
mod tests;

// Large shared hosts report hundreds of sites with full plugin lists.
const MAX_REPORT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub(crate) struct WebState {
    pub(crate) store: SqliteReportStore,
    pub(crate) provider: Arc<str>,
    pub(crate) auth_token: Arc<str>,
}

impl WebState {
    /// Opens the report database named by `config`.
    ///
    /// # Errors
    /// Returns an error when no bearer token is configured or the database
    /// cannot be opened and migrated.
    pub(crate) fn from_config(config: &SinkConfig) -> Result<Self> {
        let auth_token = config
            .auth_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .with_context(|| format!("{ENV_AUTH_TOKEN} must be set to serve the report sink"))?;
        let store = SqliteReportStore::open(&config.db_path).with_context(|| {
            format!("failed to open report database {}", config.db_path.display())
        })?;
        Ok(Self {
            store,
            provider: Arc::from(config.provider.as_str()),
            auth_token: Arc::from(auth_token),
        })
    }
}

/// Start the report sink and block until shutdown.
///
/// # Errors
/// Returns an error when the sink configuration is incomplete, the runtime
/// cannot be created, the socket cannot be bound, or the server fails.
pub fn serve_sink(config: &SinkConfig, host: &str, port: u16) -> Result<()> {
    let state = WebState::from_config(config)?;
    let bind_addr = format!("{host}:{port}");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build web runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind report sink at {bind_addr}"))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            db = %config.db_path.display(),
            provider = %config.provider,
            "report sink listening"
        );
        println!("report sink listening on http://{local_addr}");

        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("report sink failed")
    })
}

pub(crate) fn app_router(state: WebState) -> Router {
    Router::new()
        .route("/api/wordpress-report", post(handlers::ingest_report))
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/health/database", get(handlers::database_health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::require_bearer_token,
        ))
        .layer(middleware::from_fn(security::security_headers_middleware))
        .layer(DefaultBodyLimit::max(MAX_REPORT_BYTES))
        .with_state(state)
}
