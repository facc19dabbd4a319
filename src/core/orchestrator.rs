//! Agent 编排器：通道装配与后台控制循环
//!
//! 负责：加载配置、创建模型客户端与数据集、建立 cmd/state 双通道，并在单一
//! 后台任务中消费用户命令（Ask/Decide/Retry/Quit）、驱动 RunController 并把
//! 每次状态变化投影为 UiState。控制循环是唯一触碰 AgentRun 的地方（单写者）。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::{load_config, AppConfig};
use crate::core::{AgentError, AgentPhase, UiState};
use crate::llm::{MockModelClient, ModelClient, OpenAiClient};
use crate::run::{HumanDecision, RunController};
use crate::tools::{CreateChartTool, MovieFrame, QueryMovieDbTool, ToolRegistry};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交新问题；with_chart 决定本次运行是否提供图表工具
    Ask { question: String, with_chart: bool },
    /// 人工决策（审批/编辑/拒绝/回溯）
    Decide(HumanDecision),
    /// 模型调用失败后重试当前 tick
    Retry,
    /// 退出应用
    Quit,
}

/// 根据配置与环境变量选择模型客户端（OpenAI 兼容 / Mock）
pub(crate) fn create_model_from_config(cfg: &AppConfig) -> Arc<dyn ModelClient> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        tracing::info!("Using OpenAI-compatible model ({})", cfg.llm.model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            None,
        ))
    } else {
        tracing::warn!("OPENAI_API_KEY not set, using mock model client");
        Arc::new(MockModelClient::new())
    }
}

/// 加载数据集：配置的 CSV 优先，失败则回落内置样例
fn load_dataset(cfg: &AppConfig) -> Arc<MovieFrame> {
    match &cfg.tools.dataset_path {
        Some(path) => match MovieFrame::from_csv(path) {
            Ok(frame) => {
                tracing::info!(rows = frame.len(), path = %path.display(), "dataset loaded");
                Arc::new(frame)
            }
            Err(e) => {
                tracing::warn!("dataset load failed ({e}), using builtin sample");
                Arc::new(MovieFrame::builtin_sample())
            }
        },
        None => Arc::new(MovieFrame::builtin_sample()),
    }
}

/// 按本次问题构建工具注册表：查询工具常驻，图表工具按需
fn build_registry(frame: Arc<MovieFrame>, with_chart: bool) -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(QueryMovieDbTool::new(frame));
    if with_chart {
        tools.register(CreateChartTool);
    }
    Arc::new(tools)
}

/// 把当前运行投影为 UiState
fn project(controller: &RunController, error_message: Option<String>) -> UiState {
    let Some(run) = controller.run() else {
        return UiState {
            error_message,
            ..UiState::default()
        };
    };
    let phase = run.phase().clone();
    UiState {
        input_locked: matches!(phase, AgentPhase::Thinking | AgentPhase::Acting),
        events: run.events().to_vec(),
        pending: run.pending_view(),
        latest_thought: run.latest_thought().map(String::from),
        chart_specs: run.chart_specs().to_vec(),
        answer: run.answer().map(String::from),
        error_message,
        phase,
    }
}

/// 创建 Agent 运行时：返回命令发送端与状态接收端；后台任务消费命令并更新 state
pub async fn create_agent(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(mpsc::UnboundedSender<Command>, watch::Receiver<UiState>)> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let model = create_model_from_config(&cfg);
    let frame = load_dataset(&cfg);
    let charts_enabled = cfg.tools.charts_enabled;

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::default());

    let mut controller = RunController::new(model);

    tokio::spawn(async move {
        // 驱动到悬停点并投影；模型失败保相位可重试，不变量破坏丢弃运行
        async fn drive_and_project(
            controller: &mut RunController,
            state_tx: &watch::Sender<UiState>,
        ) {
            match controller.drive().await {
                Ok(_) => {
                    let _ = state_tx.send(project(controller, None));
                }
                Err(AgentError::ModelCall(e)) => {
                    tracing::warn!("model call failed: {e}");
                    let _ = state_tx.send(project(
                        controller,
                        Some(format!("Model call failed: {e}. Press r to retry.")),
                    ));
                }
                Err(e) => {
                    tracing::error!("run aborted: {e}");
                    controller.clear();
                    let _ = state_tx.send(project(controller, Some(format!("Run aborted: {e}"))));
                }
            }
        }

        loop {
            tokio::select! {
                Some(cmd) = cmd_rx.recv() => {
                    match cmd {
                        Command::Ask { question, with_chart } => {
                            let tools = build_registry(frame.clone(), with_chart && charts_enabled);
                            controller.start(&question, tools);
                            let _ = state_tx.send(project(&controller, None));
                            drive_and_project(&mut controller, &state_tx).await;
                        }
                        Command::Decide(decision) => {
                            match controller.apply(decision).await {
                                Ok(()) => {
                                    let _ = state_tx.send(project(&controller, None));
                                    drive_and_project(&mut controller, &state_tx).await;
                                }
                                Err(e) => {
                                    tracing::error!("decision aborted the run: {e}");
                                    controller.clear();
                                    let _ = state_tx.send(project(
                                        &controller,
                                        Some(format!("Run aborted: {e}")),
                                    ));
                                }
                            }
                        }
                        Command::Retry => {
                            drive_and_project(&mut controller, &state_tx).await;
                        }
                        Command::Quit => break,
                    }
                }
                else => break,  // cmd_tx 已关闭，退出循环
            }
        }
    });

    Ok((cmd_tx, state_rx))
}
