//! 智能助手 HTTP 处理器

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::request::validate_request;
use super::router::AssistState;
use super::types::{AssistRequest, DataResponse, ErrorResponse};

/// POST /api/v1/resources/smart-assist
///
/// 不要求 `content-type`；空 body 按缺少全部字段处理，返回 422 字段错误
pub async fn smart_assist(State(state): State<AssistState>, body: Bytes) -> Response {
    let payload = if body.trim_ascii().is_empty() {
        AssistRequest::default()
    } else {
        match Json::<AssistRequest>::from_bytes(&body) {
            Ok(Json(payload)) => payload,
            Err(rejection) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(rejection.body_text())),
                )
                    .into_response();
            }
        }
    };

    let input = match validate_request(&payload) {
        Ok(input) => input,
        Err(errors) => return (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response(),
    };

    match state
        .gateway
        .generate(&input.title, &input.resource_type, &input.url)
        .await
    {
        Ok(result) => Json(DataResponse { data: result }).into_response(),
        Err(e) => (e.status_code(), Json(ErrorResponse::new(e.to_string()))).into_response(),
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
