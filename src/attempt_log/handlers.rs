//! 调用记录 API 处理器

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::router::AttemptLogState;
use super::types::AttemptQuery;

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": {"type": "invalid_request_error", "message": message}
        })),
    )
        .into_response()
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": {"type": "internal_error", "message": message}
        })),
    )
        .into_response()
}

/// GET /api/admin/attempts
pub async fn get_attempts(
    State(state): State<AttemptLogState>,
    Query(query): Query<AttemptQuery>,
) -> Response {
    // 校验时间格式
    for (field, value) in [("startTime", &query.start_time), ("endTime", &query.end_time)] {
        if let Some(t) = value {
            if chrono::DateTime::parse_from_rfc3339(t).is_err() {
                return bad_request(format!("无效的 {} 格式，需要 RFC3339 格式: {}", field, t));
            }
        }
    }
    if let Some(ref status) = query.status {
        if super::AttemptStatus::parse(status).is_none() {
            return bad_request(format!("无效的 status: {}，可选值 success / error", status));
        }
    }

    match state.logger.query(query).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("查询调用记录失败: {}", e);
            internal_error(format!("查询失败: {}", e))
        }
    }
}

/// GET /api/admin/attempts/stats
pub async fn get_attempt_stats(State(state): State<AttemptLogState>) -> Response {
    match state.logger.get_stats().await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("获取调用统计失败: {}", e);
            internal_error(format!("统计失败: {}", e))
        }
    }
}

/// GET /api/admin/circuit
pub async fn get_circuit(State(state): State<AttemptLogState>) -> impl IntoResponse {
    Json(state.circuit.snapshot())
}
