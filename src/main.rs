//! Smart Assist 服务
//!
//! 为教育资源目录提供 AI 辅助元数据生成：
//! 调用 Gemini 生成描述和 tag，带熔断保护、响应校验和调用记录。

mod assist;
mod attempt_log;
mod common;
mod http_client;
mod model;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::assist::{AssistGateway, CircuitStore, GeminiClient, InMemoryCircuit};
use crate::attempt_log::AttemptLogger;
use crate::model::config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "smart-assist", version, about = "AI 辅助教育资源元数据生成服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听地址（覆盖配置文件）
    #[arg(long)]
    host: Option<String>,

    /// 监听端口（覆盖配置文件）
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "smart_assist=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号，开始关闭");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env 文件可选
    dotenvy::dotenv().ok();

    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(config.log_format);

    tracing::info!(
        config_path = ?config.config_path(),
        model = %config.gemini.model,
        database_path = %config.database_path,
        "配置已加载"
    );
    if config.gemini.effective_api_key().is_none() {
        tracing::warn!("未配置 GEMINI_API_KEY，智能助手请求将返回配置错误");
    }

    let circuit: Arc<dyn CircuitStore> = Arc::new(InMemoryCircuit::with_defaults());
    let logger = Arc::new(AttemptLogger::new(&config.database_path)?);
    let generator = Arc::new(GeminiClient::new(&config.gemini, config.proxy_url.as_deref())?);

    let gateway = Arc::new(AssistGateway::new(
        generator,
        circuit.clone(),
        logger.clone(),
        config.gemini.api_key.clone(),
    ));

    let mut app = assist::create_assist_router(gateway);

    match config.admin_api_key.as_deref().map(str::trim) {
        Some(admin_key) if !admin_key.is_empty() => {
            app = app.nest(
                "/api/admin",
                attempt_log::create_attempt_log_router(admin_key, logger.clone(), circuit),
            );
            tracing::info!("Admin API 已启用: /api/admin/attempts, /api/admin/circuit");
        }
        _ => tracing::info!("未配置 adminApiKey，Admin API 未启用"),
    }

    let app = app.layer(common::cors_layer());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    tracing::info!("启动服务: http://{}", listener.local_addr()?);
    tracing::info!("  POST /api/v1/resources/smart-assist");
    tracing::info!("  GET  /health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 所有连接已结束，等待剩余调用记录写入数据库
    logger.shutdown().await;
    tracing::info!("服务已关闭");
    Ok(())
}
