//! 状态定义：AgentPhase 与 UI 投影
//!
//! UI 只持有轻量的 UiState（阶段、事件、待审批视图、图表、错误）；
//! 完整运行状态由 AgentRun 持有并在每次变化后投影到 UiState。

use serde::Serialize;

use crate::run::AgentEvent;

/// 运行阶段；Idle 为初始，Done 为单次运行的终态（可从 Done 回溯重入 AwaitingEdit）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AgentPhase {
    Idle,
    Thinking,
    Acting,
    AwaitingApproval,
    AwaitingEdit,
    AwaitingFeedback,
    Done,
}

impl AgentPhase {
    /// 是否在等待人工决策（调度在此悬停）
    pub fn waits_for_human(&self) -> bool {
        matches!(
            self,
            AgentPhase::AwaitingApproval | AgentPhase::AwaitingEdit | AgentPhase::AwaitingFeedback
        )
    }
}

/// 待审批提议中单个调用的展示视图
#[derive(Clone, Debug, Serialize)]
pub struct PendingCall {
    pub tool_name: String,
    pub description: String,
    pub input_repr: String,
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub phase: AgentPhase,
    pub events: Vec<AgentEvent>,
    /// 待审批提议的调用列表；无待审批时为空
    pub pending: Vec<PendingCall>,
    /// 最近一条 Thought（审批界面展示 Agent 意图）
    pub latest_thought: Option<String>,
    /// 当前图表列表（由幸存 Chart 事件推导）
    pub chart_specs: Vec<serde_json::Value>,
    /// 最终回答（仅 Done 且末事件为 Answer 时）
    pub answer: Option<String>,
    pub error_message: Option<String>,
    pub input_locked: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            phase: AgentPhase::Idle,
            events: Vec::new(),
            pending: Vec::new(),
            latest_thought: None,
            chart_specs: Vec::new(),
            answer: None,
            error_message: None,
            input_locked: false,
        }
    }
}
