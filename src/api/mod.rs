//! HTTP surface: JSON API under `/api`, index page at `/`, assets under `/static`.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{FeaturesResponse, HealthResponse};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::WebConfig;
use crate::inference::PredictionService;

#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self { service }
    }
}

type SharedState = Arc<AppState>;

pub fn build_router(state: AppState, web: &WebConfig) -> Router {
    if !web.index_path.exists() {
        warn!(path = %web.index_path.display(), "index page not found");
    }
    if !web.static_dir.exists() {
        warn!(path = %web.static_dir.display(), "static assets directory not found");
    }

    let mut router = Router::new()
        .route("/api/health", get(handlers::handle_health))
        .route("/api/features", get(handlers::handle_features))
        .route("/api/predict", post(handlers::handle_predict))
        .route_service("/", ServeFile::new(&web.index_path))
        .nest_service("/static", ServeDir::new(&web.static_dir));

    if web.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, web: &WebConfig, addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, web);
    let listener = bind_listener(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}
