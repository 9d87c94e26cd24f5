//! AI 智能助手模块
//!
//! 调用 Gemini 为教育资源生成描述和 tag：熔断保护、响应校验、调用记录

pub mod circuit;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod prompt;
pub mod types;
pub mod validator;
mod handlers;
mod request;
mod router;

pub use circuit::{CircuitStore, InMemoryCircuit};
pub use gateway::AssistGateway;
pub use gemini::GeminiClient;
pub use router::create_assist_router;
