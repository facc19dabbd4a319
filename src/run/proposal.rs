//! 工具调用提议
//!
//! 一次 acting 步产出的一批调用请求，作为整体进入待审批状态；
//! 全局同一时刻至多存在一个待审批提议（硬不变量，由 AgentRun 维护）。

use serde::{Deserialize, Serialize};

/// 单个调用请求：本地生成的 call_id + 工具名 + schema 形参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            call_id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// 一批调用请求；审批/编辑/拒绝以整批为单位流转
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallProposal {
    pub calls: Vec<ToolCallRequest>,
}

impl ToolCallProposal {
    pub fn new(calls: Vec<ToolCallRequest>) -> Self {
        Self { calls }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// 提议作为 assistant 轮次写入转录时的文本表示（JSON，便于模型在后续上下文中引用）
    pub fn as_assistant_content(&self) -> String {
        serde_json::json!({
            "tool_calls": self.calls.iter().map(|c| {
                serde_json::json!({
                    "id": c.call_id,
                    "tool": c.tool_name,
                    "args": c.arguments,
                })
            }).collect::<Vec<_>>()
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_ids_are_unique() {
        let a = ToolCallRequest::new("QueryMovieDb", serde_json::json!({"query": "count()"}));
        let b = ToolCallRequest::new("QueryMovieDb", serde_json::json!({"query": "count()"}));
        assert_ne!(a.call_id, b.call_id);
        assert!(a.call_id.starts_with("call_"));
    }

    #[test]
    fn test_assistant_content_carries_all_calls() {
        let proposal = ToolCallProposal::new(vec![
            ToolCallRequest::new("QueryMovieDb", serde_json::json!({"query": "mean(rating)"})),
            ToolCallRequest::new("CreateChart", serde_json::json!({"vega_lite_spec": "{}"})),
        ]);
        let content = proposal.as_assistant_content();
        assert!(content.contains("QueryMovieDb"));
        assert!(content.contains("CreateChart"));
        assert!(content.contains("mean(rating)"));
    }
}
