//! Gemini generateContent 上游调用
//!
//! 单次超时由 HTTP Client 控制；仅在传输层失败（连接、超时、读取 body）时
//! 间隔 250ms 重试一次，非 2xx 响应原样返回给网关处理。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::http_client::build_client;
use crate::model::config::GeminiConfig;

use super::types::{GenerateContentRequest, UpstreamReply};

/// 总尝试次数（首次 + 1 次重试）
const MAX_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// 内容生成上游
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> anyhow::Result<UpstreamReply>;
}

/// Gemini REST 客户端
pub struct GeminiClient {
    client: Client,
    url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, proxy_url: Option<&str>) -> anyhow::Result<Self> {
        let client = build_client(proxy_url, config.timeout_secs)?;
        let url = format!(
            "{}/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Ok(Self { client, url })
    }

    async fn send_once(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<UpstreamReply, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", api_key)])
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        #[cfg(feature = "sensitive-logs")]
        tracing::debug!(status, body = %text, "Gemini 响应");
        #[cfg(not(feature = "sensitive-logs"))]
        tracing::debug!(
            status,
            body = %crate::common::truncate_with_ellipsis(&text, 256),
            "Gemini 响应"
        );

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);
        Ok(UpstreamReply { status, body })
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> anyhow::Result<UpstreamReply> {
        let mut attempt = 1;
        loop {
            match self.send_once(api_key, request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(attempt, "Gemini 请求失败，{}ms 后重试: {}", RETRY_DELAY.as_millis(), e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!(
                        "Gemini 请求在 {} 次尝试后失败",
                        MAX_ATTEMPTS
                    )));
                }
            }
        }
    }
}
