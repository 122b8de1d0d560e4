//! Embedding provider abstraction and implementations.
//!
//! The chat pipeline embeds queries through the [`EmbeddingProvider`]
//! trait, so tests can swap in a deterministic implementation instead of
//! a live API. Two implementations ship: [`OpenAIProvider`] for an
//! OpenAI-compatible embeddings endpoint, and [`DisabledProvider`] for
//! deployments that run on keyword search alone.
//!
//! The vector utilities used by the store live here too:
//! [`cosine_similarity`], plus [`vec_to_blob`] / [`blob_to_vec`] for the
//! little-endian f32 encoding of the `passages.embedding` BLOB column.
//!
//! Transport errors follow the same policy as the chat client: HTTP 429
//! and 5xx retry with exponential backoff (1s, 2s, 4s, ... capped at
//! 32s), other client errors fail immediately.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
///
/// Convenience wrapper around [`EmbeddingProvider::embed`] for the search
/// path, which always embeds exactly one string.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = provider.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty embedding response"))
}

// ============ Disabled Provider ============

/// Provider used when `embedding.provider = "disabled"`.
///
/// Every embed call errors. Ingest stores passages without vectors and
/// only keyword search sees them.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ OpenAI Provider ============

/// Embedding provider for an OpenAI-compatible embeddings API.
///
/// Calls `POST {base_url}/embeddings` with the configured model and
/// requested dimensionality. The API key comes from the `OPENAI_API_KEY`
/// environment variable, never from configuration files.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    config: EmbeddingConfig,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            config: config.clone(),
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn dims(&self) -> usize {
        self.config.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Newlines are flattened to spaces before the API call.
        let input: Vec<String> = texts.iter().map(|t| t.replace('\n', " ")).collect();

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "input": input,
            "dimensions": self.config.dims,
        });

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?backoff, "retrying embeddings request");
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
                        last_err = Some(anyhow!("Embeddings API returned {}", status));
                        continue;
                    }
                    if !status.is_success() {
                        let text = resp.text().await.unwrap_or_default();
                        bail!("Embeddings API returned {}: {}", status, text);
                    }
                    let payload: EmbeddingsResponse = resp
                        .json()
                        .await
                        .context("Failed to parse embeddings response")?;
                    return Ok(payload.data.into_iter().map(|row| row.embedding).collect());
                }
                Err(e) => {
                    last_err = Some(anyhow!("Embeddings request failed: {}", e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed with no attempts made")))
    }
}

/// Create the configured [`EmbeddingProvider`].
///
/// Errors on unknown provider names and when the OpenAI provider cannot
/// be constructed (missing API key).
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian `f32` bytes for a SQLite BLOB.
///
/// ```rust
/// use guidely::embedding::{blob_to_vec, vec_to_blob};
///
/// let v = vec![0.25f32, -1.5, 0.0625];
/// assert_eq!(vec_to_blob(&v).len(), 12);
/// assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`vec_to_blob`]. Trailing bytes that do not
/// fill a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            f32::from_le_bytes(bytes)
        })
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty, mismatched-length or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt()
        * b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if norm < f32::EPSILON {
        return 0.0;
    }
    dot / norm
}
