//! 智能助手路由

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use super::gateway::AssistGateway;
use super::handlers::{health, smart_assist};

/// 智能助手共享状态
#[derive(Clone)]
pub struct AssistState {
    pub gateway: Arc<AssistGateway>,
}

/// 创建智能助手路由
///
/// # 端点
/// - `POST /api/v1/resources/smart-assist` - 生成描述和 tag
/// - `GET /health` - 存活检查
pub fn create_assist_router(gateway: Arc<AssistGateway>) -> Router {
    let state = AssistState { gateway };

    Router::new()
        .route("/api/v1/resources/smart-assist", post(smart_assist))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::InMemoryCircuit;
    use crate::assist::gemini::ContentGenerator;
    use crate::assist::types::{GenerateContentRequest, UpstreamReply};
    use crate::attempt_log::{AttemptRecord, AttemptSink, AttemptStatus};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct FixedGenerator {
        reply: UpstreamReply,
    }

    #[async_trait]
    impl ContentGenerator for FixedGenerator {
        async fn generate_content(
            &self,
            _api_key: &str,
            _request: &GenerateContentRequest,
        ) -> anyhow::Result<UpstreamReply> {
            Ok(self.reply.clone())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<AttemptRecord>>,
    }

    impl AttemptSink for MemorySink {
        fn record(&self, record: AttemptRecord) {
            self.records.lock().push(record);
        }
    }

    fn app(status: u16, body: Value) -> (Router, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let gateway = AssistGateway::new(
            Arc::new(FixedGenerator {
                reply: UpstreamReply { status, body },
            }),
            Arc::new(InMemoryCircuit::with_defaults()),
            sink.clone(),
            Some("test-key".to_string()),
        );
        (create_assist_router(Arc::new(gateway)), sink)
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::post("/api/v1/resources/smart-assist")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "title": "Matemática Financeira",
            "type": "curso",
            "url": "https://example.com/curso"
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_smart_assist_success() {
        let text = json!({
            "description": "Curso focado em educação financeira aplicada.",
            "tags": ["finanças", "matemática", "investimentos"]
        })
        .to_string();
        let (app, sink) = app(
            200,
            json!({
                "candidates": [{"content": {"parts": [{"text": text}]}}],
                "usageMetadata": {"totalTokenCount": 150}
            }),
        );

        let response = app.oneshot(post_json(valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(
            body["data"]["description"],
            "Curso focado em educação financeira aplicada."
        );
        assert_eq!(body["data"]["tags"][0], "finanças");

        let records = sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttemptStatus::Success);
        assert_eq!(records[0].tokens_used, 150);
    }

    #[tokio::test]
    async fn test_smart_assist_upstream_failure() {
        let (app, sink) = app(500, json!({"error": "unavailable"}));

        let response = app.oneshot(post_json(valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].is_string());

        let records = sink.records.lock();
        assert_eq!(records[0].status, AttemptStatus::Error);
        assert_eq!(records[0].resource_title, "Matemática Financeira");
    }

    #[tokio::test]
    async fn test_smart_assist_insufficient_tags() {
        let text = json!({"description": "Descrição curta.", "tags": ["finanças", "matemática"]})
            .to_string();
        let (app, _sink) = app(
            200,
            json!({
                "candidates": [{"content": {"parts": [{"text": text}]}}],
                "usageMetadata": {"totalTokenCount": 120}
            }),
        );

        let response = app.oneshot(post_json(valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "JSON inválido: retorne exatamente 3 tags válidas.");
    }

    #[tokio::test]
    async fn test_smart_assist_validates_required_fields() {
        let (app, sink) = app(200, Value::Null);

        let response = app
            .oneshot(post_json(json!({"title": "Matemática Financeira"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["errors"]["type"].is_array());
        assert!(body["errors"]["url"].is_array());
        // 请求校验失败不经过网关
        assert!(sink.records.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let (app, _sink) = app(200, Value::Null);
        let request = Request::post("/api/v1/resources/smart-assist")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_body_reports_missing_fields() {
        let (app, sink) = app(200, Value::Null);
        // 无 content-type、无 body
        let request = Request::post("/api/v1/resources/smart-assist")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["message"], "The title field is required. (and 2 more errors)");
        for field in ["title", "type", "url"] {
            assert!(body["errors"][field].is_array(), "missing {}", field);
        }
        assert!(sink.records.lock().is_empty());
    }

    #[tokio::test]
    async fn test_json_body_without_content_type() {
        let text = json!({"description": "Descrição.", "tags": ["a", "b", "c"]}).to_string();
        let (app, _sink) = app(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}),
        );
        let request = Request::post("/api/v1/resources/smart-assist")
            .body(Body::from(valid_body().to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["tags"][2], "c");
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _sink) = app(200, Value::Null);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }
}
