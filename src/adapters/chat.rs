//! OpenAI-compatible chat-completions client.
//!
//! Endpoint: POST {api_url}
//! Auth: Bearer token

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderSettings;

use super::ProviderError;

/// Per-call sampling and timeout settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Chat-completions client
#[derive(Debug, Clone)]
pub struct ChatClient {
    api_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    /// Create a new client
    pub fn new(api_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved provider settings
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            settings.api_url.clone(),
            settings.api_key.clone(),
            settings.model.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key is available
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Run one system + user exchange and return the assistant's text
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        settings: &ChatSettings,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("GROQ_API_KEY is not set".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        debug!(model = %self.model, prompt_bytes = user.len(), "Sending chat completion");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(settings.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        extract_content(&body)
    }
}

/// Pull `choices[0].message.content` out of a response body
pub(crate) fn extract_content(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("unexpected response body: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ProviderError::Malformed("response has no message content".to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
