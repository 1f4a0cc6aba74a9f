//! HTTP and WebSocket surface
//!
//! Provides:
//! - `/ws` participant sessions
//! - The editor page and its static assets
//! - Health and document inspection endpoints

pub mod routes;
pub mod websocket;

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::sync::Coordinator;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

/// Create the router
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        // Editor page
        .route("/", get(routes::index))
        // Participant sessions
        .route("/ws", get(websocket::upgrade))
        // API endpoints
        .route("/api/document", get(routes::api_document))
        // Health check
        .route("/health", get(routes::health))
        // Static files
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Editor listening on http://{}", addr);
    }
    axum::serve(listener, router).await
}
