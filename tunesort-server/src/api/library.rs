//! Library analysis endpoint

use crate::api::auth::require_session;
use crate::api::user_gateway;
use crate::error::ApiResult;
use crate::services::{analyze_library, LibraryAnalysis};
use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::info;

/// GET /api/library/analyze - snapshot the library with genre statistics
///
/// Long-running; progress is streamed over `/api/events` while this
/// request is in flight.
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<LibraryAnalysis>> {
    let (_, session) = require_session(&state, &headers).await?;
    info!(user_id = %session.user_id, "library analysis requested");

    let gateway = user_gateway(&state, &session);
    let analysis = analyze_library(&gateway, &state.broadcaster, &session.user_id).await?;
    Ok(Json(analysis))
}
