//! 模型客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod protocol;
pub mod traits;

pub use mock::MockModelClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{Decision, ModelClient, ToolSchema};
