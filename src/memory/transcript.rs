//! 对话转录：模型的工作记忆
//!
//! 按顺序记录 system/user/assistant/tool 轮次，顺序即每次模型调用看到的上下文顺序。
//! 唯一的历史编辑手段是 truncate（截断到前缀），供回溯重生成使用。

use serde::{Deserialize, Serialize};

/// 轮次角色（与 LLM API 一致；Tool 为工具观察结果）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 单条转录轮次；tool_call_id 仅 Tool 轮次持有，指向发起该观察的调用
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl TranscriptTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn tool(content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// 转录：仅支持追加与截断到前缀，不支持任意删除
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    turns: Vec<TranscriptTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: TranscriptTurn) {
        self.turns.push(turn);
    }

    /// 截断到前 to_len 条；to_len 必须来自记录过的 rewind_point，
    /// 由构造保证不会把 Tool 轮次与其前置 Assistant 轮次拆开
    pub fn truncate(&mut self, to_len: usize) {
        self.turns.truncate(to_len);
    }

    pub fn snapshot(&self) -> &[TranscriptTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut t = Transcript::new();
        t.append(TranscriptTurn::system("sys"));
        t.append(TranscriptTurn::user("q"));
        t.append(TranscriptTurn::assistant("a"));
        let turns = t.snapshot();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[2].content, "a");
    }

    #[test]
    fn test_truncate_to_prefix() {
        let mut t = Transcript::new();
        t.append(TranscriptTurn::system("sys"));
        t.append(TranscriptTurn::user("q"));
        t.append(TranscriptTurn::assistant("proposal"));
        t.append(TranscriptTurn::tool("obs", "call_1"));
        t.truncate(2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.snapshot()[1].content, "q");
    }

    #[test]
    fn test_truncate_beyond_len_is_noop() {
        let mut t = Transcript::new();
        t.append(TranscriptTurn::user("q"));
        t.truncate(10);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_tool_turn_carries_call_id() {
        let turn = TranscriptTurn::tool("result", "call_42");
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_42"));
    }
}
