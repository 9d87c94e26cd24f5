//! 智能助手网关
//!
//! 编排一次调用：熔断检查 → 配置检查 → 上游调用 → 解析校验 → 记录结果。
//! 无论成败，每次调用恰好写入一条调用记录，并更新一次熔断状态。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::attempt_log::{AttemptRecord, AttemptSink};

use super::circuit::CircuitStore;
use super::error::AssistError;
use super::gemini::ContentGenerator;
use super::prompt;
use super::types::AssistResult;
use super::validator;

pub struct AssistGateway {
    generator: Arc<dyn ContentGenerator>,
    circuit: Arc<dyn CircuitStore>,
    attempts: Arc<dyn AttemptSink>,
    api_key: Option<String>,
}

impl AssistGateway {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        circuit: Arc<dyn CircuitStore>,
        attempts: Arc<dyn AttemptSink>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            generator,
            circuit,
            attempts,
            api_key,
        }
    }

    /// 为教育资源生成描述和 3 个 tag
    pub async fn generate(
        &self,
        title: &str,
        resource_type: &str,
        url: &str,
    ) -> Result<AssistResult, AssistError> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("smart_assist", request_id = %request_id);

        async {
            let started = Instant::now();
            // 提取到 token 数后即使后续失败也写入记录
            let mut tokens_used = 0u32;

            let outcome = self
                .call_upstream(title, resource_type, url, &mut tokens_used)
                .await;
            let latency_ms = u32::try_from(started.elapsed().as_millis()).unwrap_or(u32::MAX);

            match outcome {
                Ok(result) => {
                    self.register_success(&request_id, title, tokens_used, latency_ms);
                    Ok(result)
                }
                Err(err) => {
                    self.register_failure(&request_id, title, tokens_used, latency_ms, &err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn call_upstream(
        &self,
        title: &str,
        resource_type: &str,
        url: &str,
        tokens_used: &mut u32,
    ) -> Result<AssistResult, AssistError> {
        if self.circuit.is_open() {
            return Err(AssistError::ServiceUnavailable);
        }

        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AssistError::Misconfigured)?;

        let request = prompt::build_request(title, resource_type, url);
        let reply = self
            .generator
            .generate_content(api_key, &request)
            .await
            .map_err(|e| AssistError::Unexpected(format!("{:#}", e)))?;

        if !reply.is_success() {
            return Err(AssistError::upstream(reply.error_message()));
        }

        *tokens_used = reply.total_tokens();

        let text = reply
            .generated_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AssistError::EmptyResponse)?;

        let parsed: Value = serde_json::from_str(text).map_err(|_| AssistError::InvalidJson)?;
        let object = parsed.as_object().ok_or(AssistError::InvalidJson)?;

        Ok(validator::validate(object)?)
    }

    fn register_success(&self, request_id: &str, title: &str, tokens_used: u32, latency_ms: u32) {
        self.circuit.record_success();

        tracing::info!(
            title,
            tokens = tokens_used,
            latency_ms,
            status = "success",
            "AI Request"
        );

        self.attempts.record(AttemptRecord::success(
            request_id,
            title,
            tokens_used,
            latency_ms,
        ));
    }

    fn register_failure(
        &self,
        request_id: &str,
        title: &str,
        tokens_used: u32,
        latency_ms: u32,
        err: &AssistError,
    ) {
        let failures = self.circuit.record_failure();
        let message = err.log_message();

        tracing::error!(
            title,
            tokens = tokens_used,
            latency_ms,
            status = "error",
            error = %message,
            failures,
            "AI Request"
        );

        self.attempts.record(AttemptRecord::failure(
            request_id,
            title,
            tokens_used,
            latency_ms,
            message,
        ));
    }
}
