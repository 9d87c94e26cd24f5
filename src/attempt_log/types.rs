//! 调用记录查询 API 请求/响应类型

use serde::{Deserialize, Serialize};

/// 查询过滤器
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// "success" 或 "error"
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptListResponse {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub records: Vec<AttemptRecordResponse>,
}

/// 单条记录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecordResponse {
    pub id: i64,
    pub request_id: String,
    pub resource_title: String,
    pub tokens_used: u32,
    pub latency_ms: u32,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// 统计响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatsResponse {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub total_tokens: i64,
    pub avg_latency_ms: f64,
}
