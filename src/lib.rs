//! Heron - Rust 人机协同数据分析智能体
//!
//! 核心是一个带人工审批门的工具使用循环：thinking（回答或行动）与 acting
//! （提议工具调用）交替，任何工具执行前必须经人批准，提议可编辑、可带反馈
//! 拒绝，运行结束后可回溯历史动作重新生成。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、状态投影、通道装配与控制循环
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Mock）与输出协议
//! - **memory**: 对话转录（模型的工作记忆）
//! - **run**: 事件日志、提议、状态机与外层驱动
//! - **tools**: 数据查询与图表校验工具及注册表
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod run;
pub mod tools;
pub mod ui;
