//! 模型客户端抽象
//!
//! 两个入口对应状态机的两类步骤：decide（thinking 步，结构化决策）与
//! propose（acting 步，提议一批工具调用，可能为空）。实现方：OpenAI 兼容 / Mock。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::memory::TranscriptTurn;
use crate::run::ToolCallRequest;

/// thinking 步的结构化决策
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    /// 对已知信息与下一步行动的推理
    pub reason: String,
    /// true 表示需要执行工具；false 表示可以直接给出最终回答
    pub use_tool: bool,
    /// 最终回答（一小段）；仅当 use_tool 为 false 时提供
    #[serde(default)]
    pub answer: Option<String>,
}

/// 工具 schema：名称 + 描述（供模型理解） + 参数 JSON Schema
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// 模型客户端 trait；错误以 String 返回，由状态机统一映射为 AgentError::ModelCall
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// thinking 步：基于完整转录产出决策
    async fn decide(&self, transcript: &[TranscriptTurn]) -> Result<Decision, String>;

    /// acting 步：基于转录与可用工具 schema 提议一批调用；空列表表示模型不再需要工具
    async fn propose(
        &self,
        transcript: &[TranscriptTurn],
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolCallRequest>, String>;
}
