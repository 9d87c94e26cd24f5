//! 智能助手错误类型
//!
//! 每个变体对应一种失败类别，携带面向用户的消息和 HTTP 状态码提示。

use axum::http::StatusCode;
use thiserror::Error;

/// 响应结构校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("JSON inválido: campo description ausente ou inválido.")]
    MissingDescription,
    #[error("JSON inválido: campo tags ausente ou inválido.")]
    MissingTags,
    #[error("JSON inválido: todas as tags devem ser strings.")]
    InvalidTagType,
    #[error("JSON inválido: retorne exatamente 3 tags válidas.")]
    InsufficientTags,
}

/// 网关错误
#[derive(Debug, Error)]
pub enum AssistError {
    /// 本地配置缺失（不是上游的问题）
    #[error("Configuração ausente: defina GEMINI_API_KEY no backend.")]
    Misconfigured,

    /// 熔断器打开，未发起上游调用
    #[error("Serviço de IA temporariamente indisponível. Tente novamente em instantes.")]
    ServiceUnavailable,

    /// 上游返回非 2xx
    #[error("{0}")]
    Upstream(String),

    #[error("Resposta da IA vazia ou inválida.")]
    EmptyResponse,

    #[error("A IA não retornou JSON válido.")]
    InvalidJson,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 其他未预期的失败，内部细节只写入调用记录
    #[error("Erro inesperado ao chamar a IA.")]
    Unexpected(String),
}

impl AssistError {
    /// 根据上游错误消息构造 Upstream 错误
    pub fn upstream(api_message: Option<&str>) -> Self {
        match api_message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => Self::Upstream(format!("Falha ao gerar descrição com IA: {}", message)),
            None => Self::Upstream("Falha ao gerar descrição com IA.".to_string()),
        }
    }

    /// 返回给调用方的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) | Self::Unexpected(_) => StatusCode::BAD_GATEWAY,
            Self::EmptyResponse | Self::InvalidJson | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    /// 写入调用记录的错误文本
    ///
    /// `Unexpected` 记录内部细节，其余与用户可见消息一致
    pub fn log_message(&self) -> String {
        match self {
            Self::Unexpected(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}
