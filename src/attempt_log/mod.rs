//! AI 调用记录模块
//!
//! 每次智能助手调用写入一条记录，提供查询和统计接口

pub mod model;
pub mod store;
mod handlers;
mod router;
mod types;

pub use model::{AttemptRecord, AttemptStatus};
pub use router::create_attempt_log_router;
pub use store::{AttemptLogger, AttemptSink};
