//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! decide / propose 均为普通 chat completion + 提示词内嵌格式指令，回复按 protocol 模块解析；
//! Tool 轮次在此边界渲染为带 call_id 标注的 user 消息，模型侧无需原生 tool-call 支持。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::protocol::{decision_instruction, parse_decision, parse_proposal, proposal_instruction};
use crate::llm::{Decision, ModelClient, ToolSchema};
use crate::memory::{Role, TranscriptTurn};
use crate::run::ToolCallRequest;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client 与 model 名
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            usage: TokenUsage::default(),
        }
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    fn to_openai_messages(&self, transcript: &[TranscriptTurn]) -> Vec<ChatCompletionRequestMessage> {
        transcript
            .iter()
            .map(|turn| match turn.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .unwrap(),
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .unwrap(),
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .unwrap(),
                ),
                // 工具观察：渲染为带 call_id 标注的 user 消息
                Role::Tool => {
                    let call_id = turn.tool_call_id.as_deref().unwrap_or("?");
                    ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(format!("Tool result ({}): {}", call_id, turn.content))
                            .build()
                            .unwrap(),
                    )
                }
            })
            .collect()
    }

    /// 发送转录 + 末尾指令，返回首条补全文本
    async fn complete(&self, transcript: &[TranscriptTurn], instruction: String) -> Result<String, String> {
        let mut messages = self.to_openai_messages(transcript);
        messages.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(instruction)
                .build()
                .map_err(|e| e.to_string())?,
        ));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn decide(&self, transcript: &[TranscriptTurn]) -> Result<Decision, String> {
        let output = self.complete(transcript, decision_instruction()).await?;
        parse_decision(&output)
    }

    async fn propose(
        &self,
        transcript: &[TranscriptTurn],
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolCallRequest>, String> {
        let output = self.complete(transcript, proposal_instruction(tools)).await?;
        parse_proposal(&output)
    }
}
