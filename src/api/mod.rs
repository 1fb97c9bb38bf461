pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AnalysisConfig, Config};

#[derive(Clone)]
pub struct AppState {
    pub analysis: AnalysisConfig,
    /// Rows read for a partial (`?partial=true`) analysis.
    pub row_limit: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            analysis: config.analysis.clone(),
            row_limit: config.ingest.row_limit,
        }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(config: &Config) -> eyre::Result<()> {
    let app = router(AppState::from_config(config), config.api.max_body_bytes);
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, stopping API server");
        })
        .await?;
    Ok(())
}
