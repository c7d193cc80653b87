//! Language model invocation.

mod openai_compat;

use async_trait::async_trait;

pub use openai_compat::OpenAiCompatClient;

/// One text-completion turn.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    /// Generation stops before any of these sequences
    pub stop: Vec<String>,
    pub temperature: f32,
}

/// Something that turns a prompt into raw model text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}
