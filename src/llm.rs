use async_trait::async_trait;
use serde::Serialize;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, AppError};

/// Low temperature keeps the model from getting creative with formatting.
pub const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Black-box text completion: submit a prompt, receive text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.completion_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build completion client: {}", e)))?;

        Ok(OpenAiClient {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: chat_endpoint(&config.openai_base_url),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: system },
                Message { role: "user", content: prompt },
            ],
            temperature: ANALYSIS_TEMPERATURE,
        };

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::CompletionCall(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .map(|text| text.trim().to_string())
                .unwrap_or_else(|e| format!("<error body unreadable: {}>", e));
            return Err(AppError::CompletionCall(format!(
                "provider returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| AppError::CompletionCall(e.to_string()))?;
        let reply = extract_reply(&json)?;
        debug!(model = %self.model, chars = reply.len(), "completion received");
        Ok(reply)
    }
}

/// Resolve the chat completions endpoint from the base URL.
fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

fn extract_reply(json: &serde_json::Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::CompletionCall("Invalid response format from completion API".to_string()))
}
