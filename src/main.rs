//! 飞书任务机器人服务
//!
//! 通过飞书事件订阅接收消息，识别「创建任务: 标题」后调用任务 API 创建任务并回复。
//!
//! 配置（config/default.toml 或环境变量）:
//! - TASKBOT__LARK__APP_ID / APP_ID: 飞书应用 App ID
//! - TASKBOT__LARK__APP_SECRET / APP_SECRET: 飞书应用 App Secret
//! - TASKBOT__LARK__BASE_URL / BASE_DOMAIN: API 基地址
//!   （默认 https://open.feishu.cn，国际版用 https://open.larksuite.com）
//! - TASKBOT__LARK__VERIFICATION_TOKEN: 事件订阅 Verification Token（可选）
//! - TASKBOT__SERVER__PORT: 监听端口（默认 3001）
//!
//! 启动: cargo run -- [config.toml]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use taskbot::config::load_config;
use taskbot::integrations::lark::{create_router, LarkClient, LarkState};
use taskbot::observability;
use taskbot::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    cfg.lark.validate().context("Invalid lark config")?;

    // 客户端只读共享：任务创建与消息发送共用一份凭证与 token 缓存
    let client = Arc::new(LarkClient::new(&cfg.lark));
    let pipeline = Pipeline::new(client.clone(), client);

    let state = LarkState::new(Arc::new(pipeline))
        .with_verification_token(cfg.lark.verification_token.clone())
        .with_dedup_capacity(cfg.server.dedup_capacity);
    let app = create_router(Arc::new(state));

    let addr: std::net::SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("Invalid listen address")?;
    tracing::info!("任务创建机器人已启动 / Task creation bot started, listening on http://{}", addr);
    tracing::info!("Webhook URL: http://YOUR_HOST:{}/webhook", cfg.server.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
