//! 模型输出协议：格式指令生成与 JSON 解析
//!
//! 决策与提议都走「文本补全中嵌 JSON 块」的路线：schemars 生成的格式说明注入提示词，
//! 回复中提取 ```json 块或首尾花括号之间的内容后用 serde 解析。

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;

use crate::llm::{Decision, ToolSchema};
use crate::run::ToolCallRequest;

/// 提议 JSON 的线格式：`{"calls": [{"tool": "...", "args": {...}}]}`（仅用于 Schema 生成与解析）
#[derive(Debug, Deserialize, JsonSchema)]
struct ProposalWire {
    /// 本步要执行的调用；不再需要工具时为空数组
    calls: Vec<ProposalCallWire>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ProposalCallWire {
    /// 工具名，必须来自 Available tools
    tool: String,
    /// 工具参数，须符合该工具的参数 Schema
    args: serde_json::Value,
}

/// thinking 步的格式指令：要求回复仅含一个 Decision JSON 对象
pub fn decision_instruction() -> String {
    let schema = serde_json::to_string_pretty(&schema_for!(Decision)).unwrap_or_default();
    format!(
        "Decide your next step. Respond with a single JSON object matching this schema \
         (no other text):\n{schema}"
    )
}

/// acting 步的格式指令：列出可用工具及参数 Schema，要求回复仅含一个 ProposalWire JSON 对象
pub fn proposal_instruction(tools: &[ToolSchema]) -> String {
    let tool_list = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    let schema = serde_json::to_string_pretty(&schema_for!(ProposalWire)).unwrap_or_default();
    format!(
        "Propose the tool calls for this step.\n\nAvailable tools:\n{tool_list}\n\n\
         Respond with a single JSON object matching this schema (no other text); \
         use an empty \"calls\" array if no tool is needed:\n{schema}"
    )
}

/// 从补全文本中提取 JSON 串（```json 块优先，否则首 `{` 到末 `}`）
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

/// 解析 thinking 步输出为 Decision
pub fn parse_decision(output: &str) -> Result<Decision, String> {
    let json = extract_json(output).ok_or_else(|| format!("no JSON object in output: {output}"))?;
    serde_json::from_str(json).map_err(|e| format!("decision parse error: {e}: {json}"))
}

/// 解析 acting 步输出为一批调用请求；call_id 在本地生成
pub fn parse_proposal(output: &str) -> Result<Vec<ToolCallRequest>, String> {
    let json = extract_json(output).ok_or_else(|| format!("no JSON object in output: {output}"))?;
    let wire: ProposalWire =
        serde_json::from_str(json).map_err(|e| format!("proposal parse error: {e}: {json}"))?;
    Ok(wire
        .calls
        .into_iter()
        .map(|c| ToolCallRequest::new(c.tool, c.args))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_block() {
        let out = "Sure, here it is:\n```json\n{\"reason\": \"r\", \"use_tool\": false, \"answer\": \"a\"}\n```";
        let json = extract_json(out).unwrap();
        assert!(json.starts_with('{') && json.ends_with('}'));
    }

    #[test]
    fn test_parse_decision_plain_json() {
        let d = parse_decision(r#"{"reason": "need data", "use_tool": true}"#).unwrap();
        assert!(d.use_tool);
        assert_eq!(d.reason, "need data");
        assert!(d.answer.is_none());
    }

    #[test]
    fn test_parse_decision_rejects_garbage() {
        assert!(parse_decision("no json here").is_err());
        assert!(parse_decision(r#"{"use_tool": true}"#).is_err()); // reason 缺失
    }

    #[test]
    fn test_parse_proposal_generates_call_ids() {
        let out = r#"{"calls": [{"tool": "QueryMovieDb", "args": {"query": "count()"}}]}"#;
        let calls = parse_proposal(out).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "QueryMovieDb");
        assert!(calls[0].call_id.starts_with("call_"));
    }

    #[test]
    fn test_parse_proposal_empty_calls() {
        let calls = parse_proposal(r#"{"calls": []}"#).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn test_instructions_embed_schemas() {
        assert!(decision_instruction().contains("use_tool"));
        let tools = vec![ToolSchema {
            name: "QueryMovieDb".to_string(),
            description: "runs a query".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let instr = proposal_instruction(&tools);
        assert!(instr.contains("QueryMovieDb"));
        assert!(instr.contains("calls"));
    }
}
