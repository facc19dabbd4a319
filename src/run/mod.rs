//! Agent 运行：事件日志、提议、状态机与外层驱动

pub mod controller;
pub mod events;
pub mod machine;
pub mod proposal;

pub use controller::{HumanDecision, RunController, TickOutcome};
pub use events::{AgentEvent, EventLog};
pub use machine::AgentRun;
pub use proposal::{ToolCallProposal, ToolCallRequest};
