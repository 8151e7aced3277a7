//! Rider Assist 控制台
//!
//! 逐行读取标准输入，以固定会话 ID 运行对话轮次，输出回复与车辆指令。
//! 以 `/context {json}` 开头的行合并行程上下文，`/quit` 退出。
//!
//! 启动: cargo run -- [config.toml]

use std::path::PathBuf;

use anyhow::Context;
use rider_assist::config::load_config;
use rider_assist::session::JourneyContext;
use rider_assist::{observability, SessionOrchestrator, TurnRequest};
use tokio::io::{AsyncBufReadExt, BufReader};

const CONSOLE_SESSION: &str = "console";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let orchestrator = SessionOrchestrator::from_config(&cfg).await;

    let health = orchestrator.health().await;
    tracing::info!(
        backend = %health.store_backend,
        status = ?health.status,
        "Rider assistant ready"
    );
    println!("Rider assistant ready. Type a message, /context {{json}}, or /quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        if let Some(raw) = line.strip_prefix("/context") {
            match serde_json::from_str::<JourneyContext>(raw.trim()) {
                Ok(partial) => {
                    orchestrator.update_context(CONSOLE_SESSION, partial).await;
                    println!("Context updated");
                }
                Err(e) => println!("Invalid context JSON: {}", e),
            }
            continue;
        }

        let response = orchestrator
            .process_turn(TurnRequest::new(CONSOLE_SESSION, line))
            .await;
        println!("[{}] {}", response.intent, response.message);
        if !response.suggestions.is_empty() {
            println!("  suggestions: {}", response.suggestions.join(" | "));
        }
        for action in &response.actions {
            println!("  action: {}", serde_json::to_string(action)?);
        }
    }

    Ok(())
}
