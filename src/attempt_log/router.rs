//! 调用记录 / 熔断状态 Admin API 路由

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::get,
};

use crate::assist::CircuitStore;
use crate::common::auth;

use super::handlers::{get_attempt_stats, get_attempts, get_circuit};
use super::store::AttemptLogger;

/// Admin API 状态
#[derive(Clone)]
pub struct AttemptLogState {
    pub admin_api_key: String,
    pub logger: Arc<AttemptLogger>,
    pub circuit: Arc<dyn CircuitStore>,
}

/// Admin API 认证中间件
async fn admin_auth_middleware(
    State(state): State<AttemptLogState>,
    request: Request<Body>,
    next: Next,
) -> axum::response::Response {
    match auth::extract_api_key(&request) {
        Some(key) if auth::constant_time_eq(&key, &state.admin_api_key) => {
            next.run(request).await
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": {"type": "authentication_error", "message": "Invalid API key"}
            })),
        )
            .into_response(),
    }
}

/// 创建调用记录 Admin API 路由
///
/// # 端点
/// - `GET /attempts` - 分页查询调用记录
/// - `GET /attempts/stats` - 调用统计
/// - `GET /circuit` - 当前熔断状态
///
/// 返回 Router<()>，可直接 nest 到主应用
pub fn create_attempt_log_router(
    admin_api_key: impl Into<String>,
    logger: Arc<AttemptLogger>,
    circuit: Arc<dyn CircuitStore>,
) -> Router {
    let state = AttemptLogState {
        admin_api_key: admin_api_key.into(),
        logger,
        circuit,
    };

    Router::new()
        .route("/attempts", get(get_attempts))
        .route("/attempts/stats", get(get_attempt_stats))
        .route("/circuit", get(get_circuit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
