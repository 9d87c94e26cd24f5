//! 固定提示词模板

use super::types::{Content, GenerateContentRequest, GenerationConfig};

const SYSTEM_PROMPT_LINES: &[&str] = &[
    "Você é um Assistente Pedagógico.",
    "Retorne SOMENTE JSON válido.",
    "Não inclua texto fora do JSON.",
    "A descrição deve ser curta (máx. 2 frases) e prática.",
    "As tags devem ser 3 itens curtos e relevantes.",
    r#"Formato obrigatório: {"description":"string","tags":["string","string","string"]}."#,
];

const TEMPERATURE: f32 = 0.2;
const RESPONSE_MIME_TYPE: &str = "application/json";

pub fn system_prompt() -> String {
    SYSTEM_PROMPT_LINES.join("\n")
}

pub fn user_prompt(title: &str, resource_type: &str, url: &str) -> String {
    format!(
        "Gere descrição objetiva e 3 tags para recurso educacional. Título: {}. Tipo: {}. URL: {}.",
        title, resource_type, url
    )
}

/// 构建 generateContent 请求体
pub fn build_request(title: &str, resource_type: &str, url: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content::text(system_prompt()),
        contents: vec![Content::text(user_prompt(title, resource_type, url))],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            response_mime_type: RESPONSE_MIME_TYPE.to_string(),
        },
    }
}
