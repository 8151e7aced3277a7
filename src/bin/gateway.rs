//! Rider Assist HTTP 网关
//!
//! 启动: cargo run --bin rider-gateway --features server
//!
//! 监听地址取自 [server].bind_addr，环境变量 RIDER__SERVER__BIND_ADDR 可覆盖。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use rider_assist::config::load_config;
use rider_assist::gateway::create_router;
use rider_assist::{observability, SessionOrchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let orchestrator = Arc::new(SessionOrchestrator::from_config(&cfg).await);
    let app = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.server.bind_addr))?;
    tracing::info!("Rider gateway listening on http://{}", cfg.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
