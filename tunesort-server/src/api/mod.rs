//! HTTP API surface

pub mod auth;
pub mod events;
pub mod library;
pub mod sort;

use crate::session::Session;
use crate::spotify::{Gateway, SpotifyHttpApi};
use crate::AppState;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/auth/complete", post(auth::complete))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/library/analyze", get(library::analyze))
        .route("/api/sort/plan", post(sort::plan))
        .route("/api/sort/execute", post(sort::execute))
        .route("/api/events", get(events::stream))
        .route("/health", get(health))
}

/// Rate-limited gateway bound to one session's credentials
pub(crate) fn user_gateway(state: &AppState, session: &Session) -> Gateway {
    let api = SpotifyHttpApi::new(state.http.clone(), session.token.access_token.clone());
    Gateway::new(Arc::new(api), state.limiter.clone(), CancellationToken::new())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
