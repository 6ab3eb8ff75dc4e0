//! OAuth login flow and session endpoints
//!
//! Login is a three-leg handoff: `/login` returns the authorization URL,
//! Spotify redirects to `/callback` which stores the session and bounces
//! the browser back to the frontend with a one-time token, and the
//! frontend trades that token for the session cookie at `/complete`.
//! The cookie never travels through a redirect URL.

use crate::api::user_gateway;
use crate::error::{ApiError, ApiResult};
use crate::session::Session;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

const SESSION_COOKIE: &str = "tunesort_session";

/// GET /api/auth/login - start the OAuth flow
pub async fn login(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let oauth_state = Uuid::new_v4().to_string();
    state.oauth_states.insert(oauth_state.clone(), ()).await;
    let url = state.auth.authorize_url(&oauth_state)?;
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/auth/callback - OAuth redirect target
///
/// Always redirects back to the frontend; failures land on
/// `/auth/callback?error=...` rather than a bare error page.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let frontend = &state.config.server.frontend_url;

    if let Some(error) = query.error {
        warn!(error, "authorization denied");
        return Redirect::temporary(&format!("{}/auth/callback?error={}", frontend, error));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Redirect::temporary(&format!("{}/auth/callback?error=missing_params", frontend));
    };
    if state.oauth_states.remove(&oauth_state).await.is_none() {
        warn!("unknown or expired oauth state");
        return Redirect::temporary(&format!("{}/auth/callback?error=invalid_state", frontend));
    }

    let token = match state.auth.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "code exchange failed");
            return Redirect::temporary(&format!("{}/auth/callback?error=token_exchange", frontend));
        }
    };

    // Identify the user before the session exists
    let session = Session {
        user_id: String::new(),
        display_name: String::new(),
        token,
    };
    let gateway = user_gateway(&state, &session);
    let profile = match gateway.current_user().await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "profile fetch failed");
            return Redirect::temporary(&format!("{}/auth/callback?error=profile", frontend));
        }
    };

    let sid = state
        .sessions
        .create(Session {
            user_id: profile.id.clone(),
            display_name: profile.display_name,
            token: session.token,
        })
        .await;
    info!(user_id = %profile.id, "user logged in");

    let login_token = Uuid::new_v4().to_string();
    state.login_tokens.insert(login_token.clone(), sid).await;
    Redirect::temporary(&format!("{}/auth/callback?token={}", frontend, login_token))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub token: String,
}

/// POST /api/auth/complete - trade a one-time token for the session cookie
pub async fn complete(
    State(state): State<AppState>,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<Response> {
    let sid = state
        .login_tokens
        .remove(&request.token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("login token expired".to_string()))?;
    let session = state
        .sessions
        .get(&sid)
        .await
        .ok_or_else(|| ApiError::Unauthorized("session expired".to_string()))?;

    let max_age = state.config.session.ttl_hours * 3600;
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, sid, max_age
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("cookie encoding: {}", e)))?;

    let mut response = Json(json!({
        "userId": session.user_id,
        "displayName": session.display_name,
    }))
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// GET /api/auth/me - current user, 401 when not logged in
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let (_, session) = require_session(&state, &headers).await?;
    Ok(Json(json!({
        "userId": session.user_id,
        "displayName": session.display_name,
    })))
}

/// POST /api/auth/logout - drop the session and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(sid) = session_cookie(&headers) {
        state.sessions.delete(&sid).await;
    }
    let clear = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    );
    let clear = HeaderValue::from_str(&clear)
        .map_err(|e| ApiError::Internal(format!("cookie encoding: {}", e)))?;

    let mut response = Json(json!({ "status": "ok" })).into_response();
    response.headers_mut().insert(header::SET_COOKIE, clear);
    Ok(response)
}

/// Extract the session cookie value, if any
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == SESSION_COOKIE {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Resolve the calling session, refreshing the Spotify token if needed.
///
/// Refreshed tokens are written back to the store so concurrent requests
/// pick them up instead of refreshing again.
pub(crate) async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> ApiResult<(String, Session)> {
    let sid = session_cookie(headers)
        .ok_or_else(|| ApiError::Unauthorized("not logged in".to_string()))?;
    let mut session = state
        .sessions
        .get(&sid)
        .await
        .ok_or_else(|| ApiError::Unauthorized("session expired".to_string()))?;
    state.sessions.touch(&sid).await;

    if session.token.is_expired() {
        let refresh_token = session
            .token
            .refresh_token
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("access token expired".to_string()))?;
        let mut fresh = state
            .auth
            .refresh(&refresh_token)
            .await
            .map_err(|e| ApiError::Unauthorized(format!("token refresh failed: {}", e)))?;
        // Spotify often omits the refresh token on renewal
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = Some(refresh_token);
        }
        info!(user_id = %session.user_id, "access token refreshed");
        state.sessions.update_token(&sid, fresh.clone()).await;
        session.token = fresh;
    }

    Ok((sid, session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_extraction_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; tunesort_session=abc-123; other=1"),
        );
        assert_eq!(session_cookie(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn missing_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
    }
}
