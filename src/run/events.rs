//! 过程事件日志：面向人的可回放记录
//!
//! 思考、动作+观察、拒绝、编辑、最终回答；Action/Chart 事件额外记录 rewind_point
//! （提议写入前的转录长度），回溯时转录截断到该位置恰好移除提议及其观察。

use serde::Serialize;

/// 单条过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// thinking 步决定继续行动时的推理内容
    Thought { text: String },
    /// 已批准并执行的工具调用
    Action {
        tool_name: String,
        input_repr: String,
        output_text: String,
        rewind_point: usize,
    },
    /// Action 的图表特化：校验通过时其 spec 同时进入图表列表
    Chart {
        tool_name: String,
        input_repr: String,
        output_text: String,
        rewind_point: usize,
    },
    /// 用户拒绝了提议中的某个调用
    Rejected { tool_name: String, feedback: String },
    /// 用户提交了修改要求（待审批提议编辑或回溯编辑）
    Edited { prompt: String },
    /// 最终回答；本次运行的终点
    Answer { text: String },
}

impl AgentEvent {
    /// Action/Chart 事件的回溯点；其余事件不可作为回溯目标
    pub fn rewind_point(&self) -> Option<usize> {
        match self {
            AgentEvent::Action { rewind_point, .. } | AgentEvent::Chart { rewind_point, .. } => {
                Some(*rewind_point)
            }
            _ => None,
        }
    }
}

/// 事件日志：追加为主，truncate_from 仅供回溯使用
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<AgentEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: AgentEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&AgentEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 最近一条 Thought 的内容（审批界面展示 Agent 意图用）
    pub fn latest_thought(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            AgentEvent::Thought { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// 丢弃 index 起（含）的全部事件；回溯的事件侧截断
    pub fn truncate_from(&mut self, index: usize) {
        self.events.truncate(index);
    }

    /// 由幸存 Chart 事件重新推导图表列表：逐条重校验，仅保留校验通过的 spec。
    /// 图表列表永远是该推导的结果，不可独立修改，保证回溯后一致。
    pub fn derive_chart_specs<F>(&self, validate: F) -> Vec<serde_json::Value>
    where
        F: Fn(&str) -> Option<serde_json::Value>,
    {
        self.events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Chart { input_repr, .. } => validate(input_repr),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(rewind_point: usize) -> AgentEvent {
        AgentEvent::Action {
            tool_name: "QueryMovieDb".to_string(),
            input_repr: "count()".to_string(),
            output_text: "42".to_string(),
            rewind_point,
        }
    }

    #[test]
    fn test_latest_thought_skips_other_events() {
        let mut log = EventLog::new();
        log.append(AgentEvent::Thought {
            text: "first".to_string(),
        });
        log.append(action(2));
        log.append(AgentEvent::Thought {
            text: "second".to_string(),
        });
        log.append(AgentEvent::Rejected {
            tool_name: "QueryMovieDb".to_string(),
            feedback: "no".to_string(),
        });
        assert_eq!(log.latest_thought(), Some("second"));
    }

    #[test]
    fn test_truncate_from_drops_event_and_later() {
        let mut log = EventLog::new();
        log.append(AgentEvent::Thought {
            text: "t".to_string(),
        });
        log.append(action(2));
        log.append(AgentEvent::Answer {
            text: "done".to_string(),
        });
        log.truncate_from(1);
        assert_eq!(log.len(), 1);
        assert!(matches!(log.events()[0], AgentEvent::Thought { .. }));
    }

    #[test]
    fn test_derive_chart_specs_revalidates() {
        let mut log = EventLog::new();
        log.append(AgentEvent::Chart {
            tool_name: "CreateChart".to_string(),
            input_repr: "good".to_string(),
            output_text: "ok".to_string(),
            rewind_point: 2,
        });
        log.append(AgentEvent::Chart {
            tool_name: "CreateChart".to_string(),
            input_repr: "bad".to_string(),
            output_text: "error".to_string(),
            rewind_point: 4,
        });
        log.append(action(6));

        let specs = log.derive_chart_specs(|s| {
            (s == "good").then(|| serde_json::json!({"mark": "bar"}))
        });
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn test_rewind_point_only_on_actions() {
        assert_eq!(action(3).rewind_point(), Some(3));
        let thought = AgentEvent::Thought {
            text: "t".to_string(),
        };
        assert_eq!(thought.rewind_point(), None);
    }
}
