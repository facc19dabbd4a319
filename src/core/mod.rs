//! 核心编排层：错误、状态投影、通道装配与控制循环

pub mod error;
pub mod orchestrator;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{create_agent, Command};
pub use state::{AgentPhase, PendingCall, UiState};
