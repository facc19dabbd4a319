//! Run Controller：外层驱动
//!
//! 每个调度 tick 只做一件事：thinking/acting 阶段执行一次模型调用并立即继续，
//! 等待人工的阶段悬停直到收到决策，Done/无运行则停止调度。严格串行：
//! 上一个 tick 完成前不会开始下一个，保证不会有并发的提议或转录变更。

use std::sync::Arc;

use crate::core::{AgentError, AgentPhase};
use crate::llm::ModelClient;
use crate::run::AgentRun;
use crate::tools::ToolRegistry;

/// 人工决策；按当前阶段各取其一
#[derive(Debug, Clone)]
pub enum HumanDecision {
    /// awaiting_approval：批准并执行
    Approve,
    /// awaiting_approval：转入编辑
    RequestEdit,
    /// awaiting_approval：转入拒绝反馈
    RequestReject,
    /// awaiting_edit：提交修改要求
    SubmitEdit(String),
    /// awaiting_edit：取消
    CancelEdit,
    /// awaiting_feedback：提交拒绝反馈（可为空）
    SubmitFeedback(String),
    /// done：选中历史动作事件回溯
    SelectRewind(usize),
}

/// 单个 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 还有自动工作，立即再 tick
    Continue,
    /// 悬停等待人工决策
    WaitHuman,
    /// 运行结束或无运行
    Stopped,
}

/// 外层驱动：持有模型客户端与当前运行（至多一个）
pub struct RunController {
    model: Arc<dyn ModelClient>,
    run: Option<AgentRun>,
}

impl RunController {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model, run: None }
    }

    /// 开始新运行；进行中的运行（含待审批提议）整体丢弃，无部分携带
    pub fn start(&mut self, question: &str, tools: Arc<ToolRegistry>) {
        if self.run.is_some() {
            tracing::info!("discarding in-flight run for new question");
        }
        self.run = Some(AgentRun::new(question, tools));
    }

    pub fn run(&self) -> Option<&AgentRun> {
        self.run.as_ref()
    }

    /// 丢弃当前运行（不变量破坏后的兜底，或应用退出清理）
    pub fn clear(&mut self) {
        self.run = None;
    }

    /// 执行一个调度 tick；模型调用失败时状态不变，同一 tick 可重试
    pub async fn tick(&mut self) -> Result<TickOutcome, AgentError> {
        let Some(run) = self.run.as_mut() else {
            return Ok(TickOutcome::Stopped);
        };
        match run.phase() {
            AgentPhase::Thinking => {
                run.think_step(self.model.as_ref()).await?;
                Ok(TickOutcome::Continue)
            }
            AgentPhase::Acting => {
                run.act_step(self.model.as_ref()).await?;
                Ok(TickOutcome::Continue)
            }
            phase if phase.waits_for_human() => Ok(TickOutcome::WaitHuman),
            _ => Ok(TickOutcome::Stopped),
        }
    }

    /// tick 直到需要人工或停止
    pub async fn drive(&mut self) -> Result<TickOutcome, AgentError> {
        loop {
            match self.tick().await? {
                TickOutcome::Continue => continue,
                outcome => return Ok(outcome),
            }
        }
    }

    /// 消费一个人工决策。与当前阶段不匹配的决策记录日志后忽略
    /// （不视为状态机错误：UI 竞态下的迟到点击不应终止运行）。
    pub async fn apply(&mut self, decision: HumanDecision) -> Result<(), AgentError> {
        let Some(run) = self.run.as_mut() else {
            tracing::warn!(?decision, "decision with no active run, ignored");
            return Ok(());
        };
        let phase = run.phase().clone();
        match (&phase, decision) {
            (AgentPhase::AwaitingApproval, HumanDecision::Approve) => run.approve().await,
            (AgentPhase::AwaitingApproval, HumanDecision::RequestEdit) => run.request_edit(),
            (AgentPhase::AwaitingApproval, HumanDecision::RequestReject) => run.request_reject(),
            (AgentPhase::AwaitingEdit, HumanDecision::SubmitEdit(prompt)) => {
                run.submit_edit(&prompt)
            }
            (AgentPhase::AwaitingEdit, HumanDecision::CancelEdit) => run.cancel_edit(),
            (AgentPhase::AwaitingFeedback, HumanDecision::SubmitFeedback(feedback)) => {
                run.submit_feedback(&feedback)
            }
            (AgentPhase::Done, HumanDecision::SelectRewind(index)) => run.select_rewind(index),
            (_, decision) => {
                tracing::warn!(?phase, ?decision, "decision does not match phase, ignored");
                Ok(())
            }
        }
    }
}
