//! Agent 错误类型
//!
//! 模型/工具侧的失败一律降级为观察文本写回转录（让模型自行纠正），
//! 唯一例外：ModelCall 暂停自动推进等人工重试；InvariantViolation 表示状态机 bug，直接终止运行。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型调用失败（网络或输出解析）；当前 tick 不推进，可重试
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// 提议的工具未注册；状态机转为观察文本，非硬失败
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 工具执行失败；状态机转为观察文本，非硬失败
    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    /// 工具参数不符合 schema；状态机转为观察文本，非硬失败
    #[error("Invalid arguments: {0}")]
    ArgumentDecode(String),

    /// 状态机不变量被破坏（如出现第二个待审批提议、回溯目标不存在）；致命
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Config error: {0}")]
    Config(String),
}
