//! 工具注册表
//!
//! 所有工具实现 Tool trait，由 ToolRegistry 按名注册与查找。execute 上抛类型化
//! 错误（UnknownTool / ArgumentDecode / ToolExecutionFailed），由状态机统一降级为
//! 观察文本，让模型在下一个 thinking 步看到并自行纠正。每次调用输出结构化审计
//! 日志（JSON）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::ToolSchema;

/// 工具 trait：名称、描述（供模型理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（提议中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供模型理解功能与参数格式）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（schemars 生成）
    fn parameters_schema(&self) -> Value;

    /// 是否为图表类工具：其成功观察同时驱动图表列表
    fn renders_chart(&self) -> bool {
        false
    }

    /// 参数在审批界面与事件日志中的展示形式；默认整个 args 的 JSON
    fn render_input(&self, args: &Value) -> String {
        serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string())
    }

    /// 执行工具；参数解码失败返回 ArgumentDecode，执行失败返回
    /// ToolExecutionFailed，状态机负责降级为观察文本
    async fn execute(&self, args: Value) -> Result<String, AgentError>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>；每次运行构建一次快照
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 全部工具 schema（按名称排序，保证提示词稳定）
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// 执行指定工具：未注册返回 UnknownTool，工具自身的失败原样上抛
    pub async fn execute(&self, name: &str, args: Value) -> Result<String, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        let result = tool.execute(args.clone()).await;

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "ok": result.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&args),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
