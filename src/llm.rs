//! Chat-completion client for answer generation and summarization.
//!
//! Same transport conventions as the embedding client: OpenAI-compatible
//! JSON over HTTP, retries with exponential backoff on 429 and server
//! errors, immediate failure on other client errors.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::LlmConfig;

/// A chat model that turns a system prompt and a user prompt into text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    config: LlmConfig,
}

impl OpenAiChat {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.config.temperature,
        });

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?backoff, "retrying chat completion request");
                tokio::time::sleep(backoff).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow!("Chat API returned {}", status));
                        continue;
                    }
                    if !status.is_success() {
                        let text = resp.text().await.unwrap_or_default();
                        bail!("Chat API returned {}: {}", status, text);
                    }
                    let payload: serde_json::Value =
                        resp.json().await.context("Failed to parse chat response")?;
                    return parse_chat_response(&payload);
                }
                Err(e) => {
                    last_err = Some(anyhow!("Chat request failed: {}", e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Chat request failed with no attempts made")))
    }
}

fn parse_chat_response(payload: &serde_json::Value) -> Result<String> {
    let content = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Chat response missing choices[0].message.content"))?;
    Ok(content.trim().to_string())
}

/// Pull a JSON value out of model output that may or may not follow
/// instructions.
///
/// Tries the whole reply as JSON first, then the body of a ```json fence.
/// Returns `None` when neither parses; callers supply their own fallback.
pub fn extract_json_payload(raw: &str) -> Option<serde_json::Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find("```json")?;
    let body = &trimmed[start + "```json".len()..];
    let end = body.find("```")?;
    match serde_json::from_str::<serde_json::Value>(body[..end].trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "fenced block in model output is not valid JSON");
            None
        }
    }
}

pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    let client = OpenAiChat::new(config.clone())?;
    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response() {
        let payload = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  The tiger guards the mountain.  " } }
            ]
        });
        let text = parse_chat_response(&payload).unwrap();
        assert_eq!(text, "The tiger guards the mountain.");
    }

    #[test]
    fn test_parse_chat_response_missing_content() {
        let payload = json!({ "choices": [] });
        assert!(parse_chat_response(&payload).is_err());
    }

    #[test]
    fn test_extract_json_payload_strict() {
        let value = extract_json_payload(r#"{"summaries": ["a", "b"]}"#).unwrap();
        assert_eq!(value["summaries"][0], "a");
    }

    #[test]
    fn test_extract_json_payload_fenced() {
        let raw = "Here you go:\n```json\n{\"summaries\": [\"line one\"]}\n```\nHope that helps!";
        let value = extract_json_payload(raw).unwrap();
        assert_eq!(value["summaries"][0], "line one");
    }

    #[test]
    fn test_extract_json_payload_prefers_strict_parse() {
        let raw = r#"{"answer": "the reply itself is JSON"}"#;
        let value = extract_json_payload(raw).unwrap();
        assert_eq!(value["answer"], "the reply itself is JSON");
    }

    #[test]
    fn test_extract_json_payload_gives_up() {
        assert!(extract_json_payload("no json here at all").is_none());
        assert!(extract_json_payload("```json\nnot valid\n```").is_none());
    }
}
