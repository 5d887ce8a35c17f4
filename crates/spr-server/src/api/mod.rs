pub mod response;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use spr_store::LookupStore;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::ingest;
use crate::middleware;

/// Run the HTTP service until a shutdown signal arrives.
pub async fn serve(config: Config, store: LookupStore) -> anyhow::Result<()> {
    let ctx = features::shared::LookupContext::new(&config, store.clone())?;

    if config.crossref_feed.enabled {
        let feed = config.crossref_feed.clone();
        let search = config.search.clone();
        let scheduler_store = store.clone();
        tokio::spawn(async move {
            ingest::scheduler::run_daily(feed, search, scheduler_store).await;
        });
        tracing::info!(
            at = %config.crossref_feed.daily_update_time,
            "daily incremental update scheduled"
        );
    }

    let app = create_router(FeatureState { ctx }, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let (drained_tx, drained_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = drained_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result?;
        },
        _ = async {
            let _ = drained_rx.await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "graceful shutdown timed out, dropping open connections"
            );
        },
    }

    Ok(())
}

/// Assemble the full router: feature slices under `/api/v1` plus the
/// service-level endpoints, compression, request tracing and CORS.
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let api_v1 = features::router(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "SPR Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
