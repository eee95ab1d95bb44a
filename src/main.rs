//! IntentForge Ledger - audit trail gateway for IntentForge
//!
//! This service records spending policies, transactions, policy violations
//! and clawbacks on an append-only, hash-chained ledger and serves them back
//! with verifiable receipts.

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod ledger;
mod logging;
mod storage;

use crate::api::build_router;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::storage::LedgerRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The hash-chained ledger.
    pub ledger: Ledger,
    /// Configuration loaded at startup.
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        // Missing .env is expected in production
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Initialize logging
    logging::init();

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        api_prefix = %config.server.api_prefix,
        network = %config.chain.network,
        rpc_url = %config.chain.rpc_url,
        contract_address = %config.chain.contract_address,
        "Starting IntentForge Ledger"
    );

    if config.chain.contract_address.is_empty() {
        tracing::warn!("CONTRACT_ADDRESS is not set - receipts will carry no contract");
    }

    // Connect to database
    let pool = SqlitePool::connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            anyhow::anyhow!("Database connection error: {}", e)
        })?;

    // Initialize repository and schema
    let repository = LedgerRepository::new(pool);
    repository.init_schema().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize database schema");
        anyhow::anyhow!("Schema initialization error: {}", e)
    })?;

    tracing::info!(database = %config.database.url, "Database connected and schema initialized");

    let ledger = Ledger::new(repository, config.chain.clone());

    // Surface a tampered database at boot rather than on the first audit
    match ledger.verify_chain().await {
        Ok(report) if report.valid => {
            tracing::info!(blocks = report.blocks_checked, "Ledger chain verified");
        }
        Ok(report) => {
            tracing::error!(
                first_invalid_block = ?report.first_invalid_block,
                reason = ?report.reason,
                "Ledger chain integrity violated"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Ledger chain verification failed");
        }
    }

    let config = Arc::new(config);
    let state = AppState {
        ledger,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
