use std::net::SocketAddr;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::{
    decompression::RequestDecompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};
use tracing::{info, warn};

use super::{
    services::{health, list_nodes, metrics, run_node},
    state::AppState,
};
use crate::config::Config;
use crate::handlers::NodeRegistry;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes with tracing and the request body limit applied
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes.as_usize();

    Router::new()
        .route("/nodes", get(list_nodes))
        .route("/nodes/{name}", post(run_node))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
        // gzip request bodies are inflated before the handler reads them
        .layer(RequestDecompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config, address: SocketAddr) -> Result<(), AnyError> {
    let registry = NodeRegistry::from_config(&config)?;
    let state = AppState::new(config, registry);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "medianode API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
