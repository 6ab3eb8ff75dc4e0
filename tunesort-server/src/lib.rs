//! tunesort-server library interface
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod domain;
pub mod error;
pub mod genre;
pub mod services;
pub mod session;
pub mod spotify;

pub use crate::error::{ApiError, ApiResult};

use crate::session::{SessionStore, TtlStore};
use crate::spotify::{new_rate_limiter, SharedRateLimiter, SpotifyAuth};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tunesort_common::{Config, ProgressBroadcaster};

/// OAuth state entries expire after this long
const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);
/// One-time login tokens expire after this long
const LOGIN_TOKEN_TTL: Duration = Duration::from_secs(2 * 60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// OAuth client for the Spotify accounts service
    pub auth: Arc<SpotifyAuth>,
    /// Token-bucket limiter shared by every outbound Spotify call
    pub limiter: SharedRateLimiter,
    /// Per-user progress fan-out for SSE
    pub broadcaster: ProgressBroadcaster,
    pub sessions: SessionStore,
    /// Pending OAuth `state` parameters awaiting the callback
    pub oauth_states: TtlStore<()>,
    /// One-time tokens exchanged for a session cookie after the callback
    pub login_tokens: TtlStore<String>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::new();
        let auth = SpotifyAuth::new(
            config.spotify.client_id.clone(),
            config.spotify.client_secret.clone(),
            config.spotify.redirect_url.clone(),
            http.clone(),
        );
        let limiter = new_rate_limiter(config.spotify.rate_per_sec, config.spotify.burst);
        let session_ttl = Duration::from_secs(config.session.ttl_hours * 3600);

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            limiter,
            broadcaster: ProgressBroadcaster::new(),
            sessions: SessionStore::new(session_ttl),
            oauth_states: TtlStore::new(OAUTH_STATE_TTL),
            login_tokens: TtlStore::new(LOGIN_TOKEN_TTL),
            http,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let frontend_origin = state
        .config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));

    // Credentialed CORS: the browser sends the session cookie, so the
    // origin must be explicit rather than a wildcard
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .merge(api::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
