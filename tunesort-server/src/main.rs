//! tunesort-server - Spotify library sorting service
//!
//! Reconciles a user's liked songs against genre-named managed playlists:
//! snapshot the library, diff it into a plan, execute the plan against
//! the Spotify API under a shared rate limit, streaming progress over SSE.

use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tunesort_common::Config;
use tunesort_server::{build_router, AppState};

/// Session reaper sweep interval
const REAPER_INTERVAL: Duration = Duration::from_secs(3600);
/// Sweep interval for the short-lived OAuth state and login token stores
const TOKEN_REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tunesort-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let bind = config.server.bind.clone();
    let state = AppState::new(config);

    let shutdown = CancellationToken::new();
    state.sessions.spawn_reaper(REAPER_INTERVAL, shutdown.clone());
    state
        .oauth_states
        .spawn_reaper(TOKEN_REAPER_INTERVAL, shutdown.clone());
    state
        .login_tokens
        .spawn_reaper(TOKEN_REAPER_INTERVAL, shutdown.clone());

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
