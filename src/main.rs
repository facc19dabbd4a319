//! Heron - Rust 人机协同数据分析智能体
//!
//! 入口：初始化日志、创建编排器与 TUI，并运行主循环。

use anyhow::Context;
use heron::{core::create_agent, ui::run_app};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    // 创建编排器：返回命令发送端与状态接收端
    let (cmd_tx, state_rx) = create_agent(None).await.context("Failed to create agent")?;

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送命令）
    run_app(state_rx, cmd_tx).await.context("App run failed")?;

    Ok(())
}
