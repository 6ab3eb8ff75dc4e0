//! Sort planning and execution endpoints

use crate::api::auth::require_session;
use crate::api::user_gateway;
use crate::domain::{ExecutionResult, SortPlan};
use crate::error::ApiResult;
use crate::genre::GroupSuggestion;
use crate::services::{
    analyze_library, apply_disabled_genres, generate_sort_plan, validate_sort_plan, PlanExecutor,
};
use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Request body shared by plan and execute.
///
/// `enabled_groups` are parent genres whose children collapse into one
/// playlist; `disabled_categories` are genre names the user unchecked in
/// the preview, dropped from the plan after generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortRequest {
    pub dry_run: bool,
    pub enabled_groups: Vec<String>,
    pub disabled_categories: Vec<String>,
}

impl Default for SortRequest {
    fn default() -> Self {
        Self {
            dry_run: true,
            enabled_groups: Vec::new(),
            disabled_categories: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: SortPlan,
    pub grouping_suggestions: Vec<GroupSuggestion>,
}

async fn build_plan(
    state: &AppState,
    headers: &HeaderMap,
    request: &SortRequest,
) -> ApiResult<(SortPlan, Vec<GroupSuggestion>, crate::session::Session)> {
    let (_, session) = require_session(state, headers).await?;
    let gateway = user_gateway(state, &session);
    let analysis = analyze_library(&gateway, &state.broadcaster, &session.user_id).await?;

    let enabled: HashSet<String> = request.enabled_groups.iter().cloned().collect();
    let plan = generate_sort_plan(&analysis, &session.user_id, request.dry_run, &enabled);

    let disabled: HashSet<String> = request.disabled_categories.iter().cloned().collect();
    let plan = apply_disabled_genres(plan, &disabled);
    Ok((plan, analysis.grouping_suggestions, session))
}

/// POST /api/sort/plan - preview the moves without touching anything
pub async fn plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SortRequest>,
) -> ApiResult<Json<PlanResponse>> {
    let (plan, grouping_suggestions, session) = build_plan(&state, &headers, &request).await?;
    info!(
        user_id = %session.user_id,
        adds = plan.tracks_to_add.len(),
        removes = plan.tracks_to_remove.len(),
        "plan preview generated"
    );
    Ok(Json(PlanResponse {
        plan,
        grouping_suggestions,
    }))
}

/// POST /api/sort/execute - regenerate the plan from a fresh snapshot and
/// apply it
///
/// Always responds 200; per-operation failures are carried inside the
/// result rather than failing the request.
pub async fn execute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SortRequest>,
) -> ApiResult<Json<ExecutionResult>> {
    let (plan, _, session) = build_plan(&state, &headers, &request).await?;
    validate_sort_plan(&plan).map_err(crate::error::ApiError::from)?;

    let gateway = user_gateway(&state, &session);
    let executor = PlanExecutor::new(&gateway, &state.broadcaster, &session.user_id);
    let result = executor.execute(plan).await;
    info!(
        user_id = %session.user_id,
        success = result.success,
        errors = result.errors.len(),
        "plan executed"
    );
    Ok(Json(result))
}
