//! Server-Sent Events stream for reconciliation progress

use crate::api::auth::require_session;
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};

/// GET /api/events - per-user progress stream
///
/// Subscription cleanup rides on drop: when the client disconnects, the
/// stream is dropped, the subscription handle with it, and the
/// broadcaster forgets the queue.
pub async fn stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let (_, session) = require_session(&state, &headers).await?;
    info!(user_id = %session.user_id, "SSE client connected");

    let mut subscription = state.broadcaster.subscribe(&session.user_id);
    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => warn!(error = %e, "failed to serialize progress event"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    ))
}
