use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 日志输出格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Gemini 上游配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API 密钥（未配置时智能助手返回配置错误）
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// 模型端点前缀，最终地址为 `{endpoint}/{model}:generateContent`
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    /// 单次请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeminiConfig {
    /// 有效的 API 密钥（空白视为未配置）
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub gemini: GeminiConfig,

    /// 请求日志 SQLite 数据库路径
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Admin API 密钥（可选，启用调用记录/熔断状态查询接口）
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// HTTP 代理地址（可选）
    /// 支持格式: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "ai_request_logs.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gemini: GeminiConfig::default(),
            database_path: default_database_path(),
            admin_api_key: None,
            proxy_url: None,
            log_format: LogFormat::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 用环境变量覆盖 Gemini 配置
    ///
    /// 支持 `GEMINI_API_KEY`、`GEMINI_MODEL`、`GEMINI_ENDPOINT`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.gemini.model = model;
        }
        if let Some(endpoint) = lookup("GEMINI_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            self.gemini.endpoint = endpoint;
        }
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.timeout_secs, 10);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.gemini.effective_api_key().is_none());
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r#"{
            "port": 9000,
            "databasePath": "/tmp/logs.db",
            "adminApiKey": "admin",
            "logFormat": "json",
            "gemini": {"apiKey": "k", "model": "gemini-pro"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, "/tmp/logs.db");
        assert_eq!(config.admin_api_key.as_deref(), Some("admin"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.gemini.effective_api_key(), Some("k"));
        assert_eq!(config.gemini.model, "gemini-pro");
        // 未配置的字段回退默认值
        assert_eq!(config.gemini.timeout_secs, 10);
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let gemini = GeminiConfig {
            api_key: Some("   ".to_string()),
            ..GeminiConfig::default()
        };
        assert!(gemini.effective_api_key().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "from-env"),
            ("GEMINI_MODEL", " "),
            ("GEMINI_ENDPOINT", "http://localhost:9999/models"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.gemini.api_key.as_deref(), Some("from-env"));
        // 空白模型名不覆盖
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.endpoint, "http://localhost:9999/models");
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load("/nonexistent/dir/config.json").unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.config_path().is_some());
    }
}
