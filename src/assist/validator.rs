//! 上游响应结构校验
//!
//! 上游生成的 JSON 不可信：允许未知字段和任意顺序，
//! 多于 3 个 tag 时截断而不是拒绝。

use serde_json::{Map, Value};

use super::error::ValidationError;
use super::types::AssistResult;

/// 结果中保留的 tag 数量
pub const REQUIRED_TAGS: usize = 3;

/// 校验并规范化上游返回的对象，按顺序检查，首个失败即返回
pub fn validate(raw: &Map<String, Value>) -> Result<AssistResult, ValidationError> {
    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(ValidationError::MissingDescription)?;

    let raw_tags = raw
        .get("tags")
        .and_then(Value::as_array)
        .filter(|tags| !tags.is_empty())
        .ok_or(ValidationError::MissingTags)?;

    let mut tags: Vec<String> = Vec::with_capacity(raw_tags.len());
    for tag in raw_tags {
        let tag = tag
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ValidationError::InvalidTagType)?;

        // 大小写敏感去重，保留首次出现顺序
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }

    if tags.len() < REQUIRED_TAGS {
        return Err(ValidationError::InsufficientTags);
    }
    tags.truncate(REQUIRED_TAGS);

    Ok(AssistResult {
        description: description.to_string(),
        tags,
    })
}
