//! Mock 模型客户端（测试用，无需 API）
//!
//! 按脚本出队：with_decision / with_proposal 预先排好每一步的返回，
//! 队列取空时返回错误，便于测试模型调用失败路径。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Decision, ModelClient, ToolSchema};
use crate::memory::TranscriptTurn;
use crate::run::ToolCallRequest;

/// 脚本化 Mock 客户端
#[derive(Debug, Default)]
pub struct MockModelClient {
    decisions: Mutex<VecDeque<Decision>>,
    proposals: Mutex<VecDeque<Vec<ToolCallRequest>>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decision(self, reason: &str, use_tool: bool, answer: Option<&str>) -> Self {
        self.decisions.lock().unwrap().push_back(Decision {
            reason: reason.to_string(),
            use_tool,
            answer: answer.map(String::from),
        });
        self
    }

    pub fn with_proposal(self, calls: Vec<ToolCallRequest>) -> Self {
        self.proposals.lock().unwrap().push_back(calls);
        self
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn decide(&self, _transcript: &[TranscriptTurn]) -> Result<Decision, String> {
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "mock: no scripted decision".to_string())
    }

    async fn propose(
        &self,
        _transcript: &[TranscriptTurn],
        _tools: &[ToolSchema],
    ) -> Result<Vec<ToolCallRequest>, String> {
        self.proposals
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "mock: no scripted proposal".to_string())
    }
}
