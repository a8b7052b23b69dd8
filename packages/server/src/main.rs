use std::sync::Arc;

use anyhow::Context;
use coldstore_server::config::AppConfig;
use coldstore_server::state::AppState;
use coldstore_server::store::DbRecordStore;
use coldstore_server::{build_router, database, sweep};
use common::integrity::VerificationService;
use common::LocationKind;
use common::storage::BlobSources;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

    let sources = BlobSources::from_config(&config.storage).context("Invalid storage config")?;
    let configured: Vec<_> = LocationKind::ALL
        .iter()
        .filter(|kind| sources.is_configured(**kind))
        .map(LocationKind::as_str)
        .collect();
    info!(backends = ?configured, "Blob sources ready");
    let integrity = VerificationService::new(
        Arc::new(DbRecordStore::new(db)),
        Arc::new(sources),
        &config.integrity,
    );

    let shutdown = CancellationToken::new();
    let sweep_handle = config.sweep.enabled.then(|| {
        tokio::spawn(sweep::run(
            integrity.clone(),
            config.sweep.clone(),
            shutdown.child_token(),
        ))
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        config,
        integrity,
        shutdown: shutdown.clone(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_token.cancel();
        })
        .await?;

    if let Some(handle) = sweep_handle {
        handle.await.context("Sweep task panicked")?;
    }
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
