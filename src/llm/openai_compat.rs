//! Client for OpenAI-compatible `/chat/completions` endpoints
//! (DeepSeek, DashScope compatible mode, local servers).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CompletionRequest, LlmClient};

pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiCompatClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut body = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "stream": false,
        });
        if !request.stop.is_empty() {
            body["stop"] = json!(request.stop);
        }

        tracing::debug!(model = %request.model, url = %url, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Error calling LLM: {}", e))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("LLM API error ({}): {}", status, text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Invalid LLM response: {}: {}", e, text))?;

        let content = completion_text(parsed)?;
        tracing::debug!("LLM returned {} chars", content.len());
        Ok(content)
    }
}

/// Text of the first choice; a reply without one is a provider fault.
fn completion_text(response: ChatResponse) -> anyhow::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("LLM returned no choices"))?
        .message
        .content
        .ok_or_else(|| anyhow::anyhow!("LLM returned empty response"))
}
