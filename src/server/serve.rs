//! Serving the router with graceful shutdown

use crate::config::ServerConfig;
use crate::core::store::StoreConnector;
use crate::server::handlers::AppState;
use crate::server::router::build_router;
use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the catalog API until a shutdown signal arrives
///
/// This will:
/// - Open the store connection eagerly (requests reconnect lazily if it fails)
/// - Bind to the configured address and serve requests
/// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
/// - Close the store connection once in-flight requests are done
pub async fn serve(config: &ServerConfig, connector: Arc<dyn StoreConnector>) -> Result<()> {
    if connector.connect().await.is_err() {
        tracing::warn!("store unavailable at startup, connecting on first request instead");
    }

    let app = build_router(AppState::new(connector.clone()));
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connector.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
