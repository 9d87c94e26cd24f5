//! 入站请求校验
//!
//! 字段先去除首尾空白再校验：必填、字符串、长度上限，url 必须是带主机名的绝对地址。

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::types::AssistRequest;

const TITLE_MAX: usize = 255;
const TYPE_MAX: usize = 100;
const URL_MAX: usize = 2048;

/// 校验通过的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub title: String,
    pub resource_type: String,
    pub url: String,
}

/// 校验失败响应 `{"message": "...", "errors": {"field": ["..."]}}`
#[derive(Debug, Serialize)]
pub struct FieldErrors {
    pub message: String,
    pub errors: BTreeMap<&'static str, Vec<String>>,
}

impl FieldErrors {
    fn from_map(errors: BTreeMap<&'static str, Vec<String>>) -> Self {
        let total: usize = errors.values().map(Vec::len).sum();
        let first = errors
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_default();
        let message = match total {
            0 | 1 => first,
            2 => format!("{} (and 1 more error)", first),
            n => format!("{} (and {} more errors)", first, n - 1),
        };
        Self { message, errors }
    }
}

/// 校验单个字符串字段，失败时写入 errors
fn string_field(
    errors: &mut BTreeMap<&'static str, Vec<String>>,
    name: &'static str,
    value: Option<&Value>,
    max_chars: usize,
) -> Option<String> {
    let message = match value {
        None | Some(Value::Null) => format!("The {} field is required.", name),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                format!("The {} field is required.", name)
            } else if trimmed.chars().count() > max_chars {
                format!(
                    "The {} field must not be greater than {} characters.",
                    name, max_chars
                )
            } else {
                return Some(trimmed.to_string());
            }
        }
        Some(_) => format!("The {} field must be a string.", name),
    };
    errors.entry(name).or_default().push(message);
    None
}

fn is_absolute_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| u.has_host())
        .unwrap_or(false)
}

pub fn validate_request(request: &AssistRequest) -> Result<ValidatedRequest, FieldErrors> {
    let mut errors = BTreeMap::new();

    let title = string_field(&mut errors, "title", request.title.as_ref(), TITLE_MAX);
    let resource_type = string_field(&mut errors, "type", request.resource_type.as_ref(), TYPE_MAX);
    let url = string_field(&mut errors, "url", request.url.as_ref(), URL_MAX);

    let url = url.filter(|u| {
        let valid = is_absolute_url(u);
        if !valid {
            errors
                .entry("url")
                .or_default()
                .push("The url field must be a valid URL.".to_string());
        }
        valid
    });

    match (title, resource_type, url) {
        (Some(title), Some(resource_type), Some(url)) if errors.is_empty() => Ok(ValidatedRequest {
            title,
            resource_type,
            url,
        }),
        _ => Err(FieldErrors::from_map(errors)),
    }
}
