//! 智能助手类型定义

use serde::{Deserialize, Serialize};
use serde_json::Value;

// === 入站请求/响应 ===

/// 智能助手请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistRequest {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
}

/// 网关输出：规范化后的描述和 3 个 tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistResult {
    pub description: String,
    pub tags: Vec<String>,
}

/// 成功响应 `{"data": {...}}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// 错误响应 `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// === Gemini generateContent 请求 ===

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_mime_type: String,
}

/// generateContent 请求体
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

// === Gemini generateContent 响应 ===

/// 上游原始响应（状态码 + 尽量解析的 JSON body）
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    /// body 不是合法 JSON 时为 `Value::Null`
    pub body: Value,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `error.message`
    pub fn error_message(&self) -> Option<&str> {
        self.body.pointer("/error/message").and_then(Value::as_str)
    }

    /// `usageMetadata.totalTokenCount`，缺失或无法识别时为 0
    ///
    /// 接受整数、浮点数（截断）和数字字符串
    pub fn total_tokens(&self) -> u32 {
        let count = match self.body.pointer("/usageMetadata/totalTokenCount") {
            Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as u64))
            }
            _ => None,
        };
        count
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    /// `candidates[0].content.parts[0].text`
    pub fn generated_text(&self) -> Option<&str> {
        self.body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
    }
}
