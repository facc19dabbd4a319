//! Agent 状态机
//!
//! AgentRun 聚合一次运行的全部状态：阶段、转录、事件日志、工具快照、
//! 待审批提议与回溯目标。所有转录/事件变更都发生在本模块枚举的转换里，
//! 单写者：只有状态机改它，由 Run Controller 的 tick 与人工决策驱动。
//!
//! thinking（决策：回答或行动）与 acting（提议一批工具调用）交替；任何工具
//! 执行前必须经人工批准，提议可编辑、可带反馈拒绝；Done 后可选中历史
//! Action/Chart 事件回溯（转录截断到其 rewind_point）再生成。

use std::sync::Arc;

use crate::core::{AgentError, AgentPhase, PendingCall};
use crate::llm::{ModelClient, ToolSchema};
use crate::memory::{Transcript, TranscriptTurn};
use crate::run::{AgentEvent, EventLog, ToolCallProposal};
use crate::tools::{parse_chart_spec, CreateChartTool, ToolRegistry};

/// 一次 Agent 运行；新问题提交时整体替换，无部分携带
pub struct AgentRun {
    phase: AgentPhase,
    transcript: Transcript,
    events: EventLog,
    tools: Arc<ToolRegistry>,
    /// 本次运行可用工具 schema 快照
    schemas: Vec<ToolSchema>,
    /// 待审批提议；硬不变量：至多一个
    pending: Option<ToolCallProposal>,
    /// Done 后选中的回溯目标（事件索引）
    rewind_target: Option<usize>,
    /// 图表列表；只在执行与回溯路径上变更，始终等于幸存 Chart 事件的推导结果
    chart_specs: Vec<serde_json::Value>,
}

impl AgentRun {
    /// 创建新运行：写入 system + user 轮次，进入 thinking。
    /// 图表工具已注册时 system 提示追加图表指引（与提议侧能力一致）。
    pub fn new(question: &str, tools: Arc<ToolRegistry>) -> Self {
        let mut system = String::from(
            "You are a data analyst with access to a tool that runs queries on a movie database.",
        );
        if tools.get(CreateChartTool::NAME).is_some() {
            system.push_str(
                " After computing the data, create a chart using a Vega-Lite specification.",
            );
        }

        let mut transcript = Transcript::new();
        transcript.append(TranscriptTurn::system(system));
        transcript.append(TranscriptTurn::user(question));

        let schemas = tools.schemas();
        Self {
            phase: AgentPhase::Thinking,
            transcript,
            events: EventLog::new(),
            tools,
            schemas,
            pending: None,
            rewind_target: None,
            chart_specs: Vec::new(),
        }
    }

    pub fn phase(&self) -> &AgentPhase {
        &self.phase
    }

    pub fn transcript(&self) -> &[TranscriptTurn] {
        self.transcript.snapshot()
    }

    pub fn events(&self) -> &[AgentEvent] {
        self.events.events()
    }

    pub fn chart_specs(&self) -> &[serde_json::Value] {
        &self.chart_specs
    }

    pub fn pending(&self) -> Option<&ToolCallProposal> {
        self.pending.as_ref()
    }

    pub fn latest_thought(&self) -> Option<&str> {
        self.events.latest_thought()
    }

    /// 最终回答：Done 且末事件为 Answer 时的文本
    pub fn answer(&self) -> Option<&str> {
        match self.events.events().last() {
            Some(AgentEvent::Answer { text }) => Some(text.as_str()),
            _ => None,
        }
    }

    /// 待审批调用的展示视图（工具描述 + 人类可读参数）
    pub fn pending_view(&self) -> Vec<PendingCall> {
        let Some(proposal) = &self.pending else {
            return Vec::new();
        };
        proposal
            .calls
            .iter()
            .map(|call| {
                let tool = self.tools.get(&call.tool_name);
                PendingCall {
                    tool_name: call.tool_name.clone(),
                    description: tool
                        .as_ref()
                        .map(|t| t.description().to_string())
                        .unwrap_or_default(),
                    input_repr: tool
                        .as_ref()
                        .map(|t| t.render_input(&call.arguments))
                        .unwrap_or_else(|| call.arguments.to_string()),
                }
            })
            .collect()
    }

    fn expect_phase(&self, expected: AgentPhase, op: &str) -> Result<(), AgentError> {
        if self.phase != expected {
            return Err(AgentError::InvariantViolation(format!(
                "{op} is not legal in phase {:?}",
                self.phase
            )));
        }
        Ok(())
    }

    /// thinking 步：决策失败不改动任何状态（同一 tick 可重试）
    pub async fn think_step(&mut self, model: &dyn ModelClient) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::Thinking, "think_step")?;

        let decision = model
            .decide(self.transcript.snapshot())
            .await
            .map_err(AgentError::ModelCall)?;

        // use_tool=false 时 answer 必须非空；否则视为模型输出不合约，整个 tick 作废
        let answer = if decision.use_tool {
            None
        } else {
            match decision.answer.as_deref().map(str::trim) {
                Some(a) if !a.is_empty() => Some(a.to_string()),
                _ => {
                    return Err(AgentError::ModelCall(
                        "decision has use_tool=false but no answer".to_string(),
                    ))
                }
            }
        };

        self.transcript
            .append(TranscriptTurn::assistant(decision.reason.clone()));

        match answer {
            None => {
                tracing::debug!(reason = %decision.reason, "thinking: use tool");
                self.events.append(AgentEvent::Thought {
                    text: decision.reason,
                });
                self.phase = AgentPhase::Acting;
            }
            Some(text) => {
                tracing::debug!("thinking: final answer");
                self.events.append(AgentEvent::Answer { text });
                self.phase = AgentPhase::Done;
            }
        }
        Ok(())
    }

    /// acting 步：模型提议一批调用进入待审批；空提议直接结束运行
    /// （沿用原始可观察行为：不合成 Answer 事件）
    pub async fn act_step(&mut self, model: &dyn ModelClient) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::Acting, "act_step")?;
        if self.pending.is_some() {
            return Err(AgentError::InvariantViolation(
                "acting with a proposal already pending".to_string(),
            ));
        }

        let calls = model
            .propose(self.transcript.snapshot(), &self.schemas)
            .await
            .map_err(AgentError::ModelCall)?;

        if calls.is_empty() {
            tracing::warn!("acting step proposed no calls; run ends without an answer event");
            self.phase = AgentPhase::Done;
            return Ok(());
        }

        self.pending = Some(ToolCallProposal::new(calls));
        self.phase = AgentPhase::AwaitingApproval;
        Ok(())
    }

    /// 批准：记录 rewind_point，写入提议轮次，逐调用执行并写回观察与事件
    pub async fn approve(&mut self) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::AwaitingApproval, "approve")?;
        let proposal = self.pending.take().ok_or_else(|| {
            AgentError::InvariantViolation("approve with no pending proposal".to_string())
        })?;

        let rewind_point = self.transcript.len();
        self.transcript
            .append(TranscriptTurn::assistant(proposal.as_assistant_content()));

        for call in &proposal.calls {
            let tool = self.tools.get(&call.tool_name);
            let input_repr = tool
                .as_ref()
                .map(|t| t.render_input(&call.arguments))
                .unwrap_or_else(|| call.arguments.to_string());
            let renders_chart = tool.as_ref().map(|t| t.renders_chart()).unwrap_or(false);

            // 工具侧失败（未注册/参数/执行）一律降级为观察，让模型下一步自行纠正
            let (output_text, executed_ok) = match self
                .tools
                .execute(&call.tool_name, call.arguments.clone())
                .await
            {
                Ok(text) => (text, true),
                Err(AgentError::UnknownTool(name)) => {
                    (format!("Error: unknown tool '{name}'"), false)
                }
                Err(e) => (format!("Error: {e}"), false),
            };

            self.transcript
                .append(TranscriptTurn::tool(output_text.clone(), &call.call_id));

            if renders_chart {
                // 执行失败的图表调用不进图表列表，即便 spec 字符串本身能通过校验
                if executed_ok {
                    if let Ok(spec) = parse_chart_spec(&input_repr) {
                        self.chart_specs.push(spec);
                    }
                }
                self.events.append(AgentEvent::Chart {
                    tool_name: call.tool_name.clone(),
                    input_repr,
                    output_text,
                    rewind_point,
                });
            } else {
                self.events.append(AgentEvent::Action {
                    tool_name: call.tool_name.clone(),
                    input_repr,
                    output_text,
                    rewind_point,
                });
            }
        }

        self.phase = AgentPhase::Thinking;
        Ok(())
    }

    /// 审批界面选择「编辑」：保留待审批提议，进入编辑态
    pub fn request_edit(&mut self) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::AwaitingApproval, "request_edit")?;
        self.phase = AgentPhase::AwaitingEdit;
        Ok(())
    }

    /// 审批界面选择「拒绝」：进入反馈输入态
    pub fn request_reject(&mut self) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::AwaitingApproval, "request_reject")?;
        self.phase = AgentPhase::AwaitingFeedback;
        Ok(())
    }

    /// 提交修改要求：待审批提议走「提议 + 每调用一条合成观察」路径，
    /// 回溯目标走「截断 + 新 user 轮次」路径；之后都回到 acting 重新提议
    pub fn submit_edit(&mut self, prompt: &str) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::AwaitingEdit, "submit_edit")?;

        if let Some(proposal) = self.pending.take() {
            let edit_msg = format!(
                "User wants changes to the proposed input: {prompt}. \
                 Regenerate the tool call with these changes."
            );
            self.transcript
                .append(TranscriptTurn::assistant(proposal.as_assistant_content()));
            for call in &proposal.calls {
                self.transcript
                    .append(TranscriptTurn::tool(edit_msg.clone(), &call.call_id));
            }
            self.events.append(AgentEvent::Edited {
                prompt: prompt.to_string(),
            });
            self.phase = AgentPhase::Acting;
            return Ok(());
        }

        if let Some(index) = self.rewind_target.take() {
            return self.rewind_and_edit(index, prompt);
        }

        Err(AgentError::InvariantViolation(
            "submit_edit with neither pending proposal nor rewind target".to_string(),
        ))
    }

    /// 取消编辑：待审批提议回到审批态；回溯场景回到 Done
    pub fn cancel_edit(&mut self) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::AwaitingEdit, "cancel_edit")?;
        if self.pending.is_some() {
            self.phase = AgentPhase::AwaitingApproval;
        } else {
            self.rewind_target = None;
            self.phase = AgentPhase::Done;
        }
        Ok(())
    }

    /// 提交拒绝反馈：每个调用一条 Rejected 事件与一条拒绝观察，回到 thinking
    pub fn submit_feedback(&mut self, feedback: &str) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::AwaitingFeedback, "submit_feedback")?;
        let proposal = self.pending.take().ok_or_else(|| {
            AgentError::InvariantViolation("submit_feedback with no pending proposal".to_string())
        })?;

        let mut rejection_msg = String::from("User rejected this action.");
        if feedback.trim().is_empty() {
            rejection_msg.push_str(" Try a different approach.");
        } else {
            rejection_msg.push_str(&format!(" User feedback: {feedback}"));
        }

        self.transcript
            .append(TranscriptTurn::assistant(proposal.as_assistant_content()));
        for call in &proposal.calls {
            self.events.append(AgentEvent::Rejected {
                tool_name: call.tool_name.clone(),
                feedback: feedback.to_string(),
            });
            self.transcript
                .append(TranscriptTurn::tool(rejection_msg.clone(), &call.call_id));
        }

        self.phase = AgentPhase::Thinking;
        Ok(())
    }

    /// Done 后选中历史 Action/Chart 事件作为回溯目标，进入编辑态
    pub fn select_rewind(&mut self, event_index: usize) -> Result<(), AgentError> {
        self.expect_phase(AgentPhase::Done, "select_rewind")?;
        match self.events.get(event_index) {
            Some(event) if event.rewind_point().is_some() => {
                self.rewind_target = Some(event_index);
                self.phase = AgentPhase::AwaitingEdit;
                Ok(())
            }
            _ => Err(AgentError::InvariantViolation(format!(
                "rewind target {event_index} is not an action event"
            ))),
        }
    }

    /// 回溯并编辑：转录截断到目标事件的 rewind_point，事件日志丢弃目标及其后，
    /// 图表列表由幸存 Chart 事件重新推导，然后以新 user 轮次要求重新生成
    fn rewind_and_edit(&mut self, event_index: usize, prompt: &str) -> Result<(), AgentError> {
        let rewind_point = self
            .events
            .get(event_index)
            .and_then(AgentEvent::rewind_point)
            .ok_or_else(|| {
                AgentError::InvariantViolation(format!(
                    "rewind target {event_index} not found in event log"
                ))
            })?;

        self.transcript.truncate(rewind_point);
        self.events.truncate_from(event_index);
        self.chart_specs = self.events.derive_chart_specs(|s| parse_chart_spec(s).ok());

        self.transcript.append(TranscriptTurn::user(format!(
            "User wants changes: {prompt}. Regenerate the tool call."
        )));
        self.events.append(AgentEvent::Edited {
            prompt: prompt.to_string(),
        });
        self.phase = AgentPhase::Acting;
        Ok(())
    }
}
