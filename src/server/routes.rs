//! HTTP routes

use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
};

use super::AppState;
use crate::sync::DocumentSnapshot;

/// Editor page
pub async fn index() -> impl IntoResponse {
    Html(include_str!("../../static/index.html"))
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET /api/document
pub async fn api_document(State(state): State<AppState>) -> Json<DocumentSnapshot> {
    Json(state.coordinator.snapshot())
}
