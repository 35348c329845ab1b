pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::monitor::engine::RateClassifier;

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<RateClassifier>,
}

pub fn router(classifier: Arc<RateClassifier>) -> Router {
    let state = Arc::new(AppState { classifier });

    Router::new()
        .route("/", get(handlers::status_check))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/monitor_txn", post(handlers::monitor_txn))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    classifier: Arc<RateClassifier>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(classifier);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre::eyre!("Failed to bind API server to {}: {}", addr, e))?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
