//! 记忆层：对话转录（模型的工作记忆）

pub mod transcript;

pub use transcript::{Role, Transcript, TranscriptTurn};
