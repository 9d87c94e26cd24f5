//! 调用记录数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 调用结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Error,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// 一次智能助手调用的记录（只追加，不更新不删除）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub request_id: String,
    pub resource_title: String,
    pub tokens_used: u32,
    pub latency_ms: u32,
    pub status: AttemptStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn success(
        request_id: impl Into<String>,
        resource_title: impl Into<String>,
        tokens_used: u32,
        latency_ms: u32,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            resource_title: resource_title.into(),
            tokens_used,
            latency_ms,
            status: AttemptStatus::Success,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(
        request_id: impl Into<String>,
        resource_title: impl Into<String>,
        tokens_used: u32,
        latency_ms: u32,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            resource_title: resource_title.into(),
            tokens_used,
            latency_ms,
            status: AttemptStatus::Error,
            error_message: Some(error_message.into()),
            created_at: Utc::now(),
        }
    }
}
