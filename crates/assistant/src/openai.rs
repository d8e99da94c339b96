use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{AssistantError, LanguageModel};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.into(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-ada-002".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingList {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    async fn post_json(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<u8>, AssistantError> {
        let response = self
            .http
            .post(join_url(&self.config.base_url, path))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        if !status.is_success() {
            return Err(AssistantError::Provider {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).chars().take(300).collect(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, AssistantError> {
        let payload = json!({
            "model": self.config.chat_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_content },
            ],
            "temperature": 0.3,
        });
        let body = self.post_json("/chat/completions", payload).await?;
        let content = parse_chat_completion(&body)?;
        debug!(reply_len = content.len(), "chat completion received");
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyInput);
        }
        let payload = json!({
            "model": self.config.embedding_model,
            "input": text,
        });
        let body = self.post_json("/embeddings", payload).await?;
        parse_embedding(&body)
    }
}

pub fn parse_chat_completion(body: &[u8]) -> Result<String, AssistantError> {
    let resp: ChatCompletion =
        serde_json::from_slice(body).map_err(|e| AssistantError::Decode(e.to_string()))?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AssistantError::Decode("no content in chat completion".into()))
}

pub fn parse_embedding(body: &[u8]) -> Result<Vec<f32>, AssistantError> {
    let resp: EmbeddingList =
        serde_json::from_slice(body).map_err(|e| AssistantError::Decode(e.to_string()))?;
    resp.data
        .into_iter()
        .next()
        .map(|item| item.embedding)
        .filter(|embedding| !embedding.is_empty())
        .ok_or_else(|| AssistantError::Decode("failed to fetch embedding".into()))
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
#[path = "tests/openai_tests.rs"]
mod tests;
