use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::monitor::{QuotaErrorRecord, UsageStats, WindowSnapshot, DEFAULT_RECENT_ERRORS};

use super::types::{
    AlertResponse, CleanupResponse, ErrorResponse, RecentErrorsQuery, ResetQuotaRequest,
    ResetQuotaResponse, ScopeQuery,
};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub async fn get_stats(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<UsageStats> {
    let caller_id = validated_caller(query.caller_id.as_deref())?;
    Ok(Json(state.monitor.stats(caller_id)))
}

pub async fn get_alerts(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<AlertResponse> {
    let caller_id = validated_caller(query.caller_id.as_deref())?;
    Ok(Json(AlertResponse {
        alert: state.monitor.check_alerts(caller_id),
    }))
}

pub async fn recent_errors(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RecentErrorsQuery>,
) -> ApiResult<Vec<QuotaErrorRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_ERRORS);
    Ok(Json(state.monitor.recent_errors(limit)))
}

pub async fn list_windows(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<WindowSnapshot>> {
    Ok(Json(state.monitor.snapshots()))
}

pub async fn reset_quota(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ResetQuotaRequest>,
) -> ApiResult<ResetQuotaResponse> {
    let caller_id = match (validated_caller(request.caller_id.as_deref())?, request.all) {
        (Some(caller_id), false) => Some(caller_id),
        (None, true) => None,
        _ => {
            return Err(bad_request(
                "invalid_reset_request",
                "provide either caller_id or all=true",
            ))
        }
    };

    state.monitor.reset(caller_id);
    info!(
        caller_id = caller_id.unwrap_or("*"),
        "quota reset requested via admin API"
    );

    Ok(Json(ResetQuotaResponse { success: true }))
}

pub async fn cleanup_quota(State(state): State<Arc<ApiState>>) -> ApiResult<CleanupResponse> {
    let removed = state.monitor.cleanup_expired();
    Ok(Json(CleanupResponse { removed }))
}

pub async fn health_check(State(state): State<Arc<ApiState>>) -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "storage-quota-monitor",
        "per_caller_limit": state.config.per_caller_limit,
        "global_limit": state.config.global_limit,
        "window_secs": state.config.window_secs,
    })))
}

fn validated_caller(caller_id: Option<&str>) -> Result<Option<&str>, (StatusCode, Json<ErrorResponse>)> {
    match caller_id {
        Some(id) if id.trim().is_empty() => {
            Err(bad_request("invalid_caller_id", "caller_id cannot be empty"))
        }
        other => Ok(other),
    }
}

fn bad_request(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}
