//! Chat turn orchestration: gate, retrieve, decide, generate.
//!
//! Every turn produces a well-formed [`ChatOutcome`]. Gate refusals,
//! "I don't know" turns and provider failures all come back as normal
//! outcomes with canned text and empty sources; the only errors that
//! escape this module are store failures, which the HTTP layer maps to
//! 5xx.

use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::lexicon::Lexicon;
use crate::llm::LlmClient;
use crate::models::RankedResult;
use crate::personas::Persona;
use crate::relevance;
use crate::retrieval;

/// Maximum characters of passage text quoted back in a source entry.
pub const PREVIEW_CHARS: usize = 300;

/// One cited passage, in response order.
#[derive(Debug, Clone, Serialize)]
pub struct SourceAttribution {
    pub source_locator: String,
    pub content_preview: String,
    pub rank: usize,
    pub similarity_score: f64,
    pub document_title: String,
    pub passage_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub sources: Vec<SourceAttribution>,
}

impl ChatOutcome {
    fn canned(line: &str) -> Self {
        Self {
            response: line.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Run one chat turn end to end.
pub async fn answer_chat(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    llm: &dyn LlmClient,
    lexicon: &Lexicon,
    config: &RetrievalConfig,
    persona: &Persona,
    message: &str,
) -> Result<ChatOutcome> {
    if !relevance::is_relevant(lexicon, message) {
        tracing::info!(persona = persona.key, "message rejected by relevance gate");
        return Ok(ChatOutcome::canned(persona.refusal_line));
    }

    let query_vector = match embed_query(provider, message).await {
        Ok(vector) => vector,
        Err(e) => {
            tracing::error!(error = %e, "query embedding failed");
            return Ok(ChatOutcome::canned(persona.apology_line));
        }
    };

    let ranked = retrieval::retrieve_with_vector(pool, lexicon, config, message, &query_vector).await?;

    if !retrieval::should_answer(lexicon, config, message, &ranked) {
        tracing::info!(
            candidates = ranked.len(),
            persona = persona.key,
            "no grounded answer available"
        );
        return Ok(ChatOutcome::canned(persona.unknown_line));
    }

    let context = build_context(&ranked);
    let prompt = build_user_prompt(persona, &context, message);

    let response = match llm.chat(persona.system_prompt, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "chat completion failed");
            return Ok(ChatOutcome::canned(persona.apology_line));
        }
    };

    let sources = ranked
        .iter()
        .enumerate()
        .map(|(i, result)| source_from(result, i + 1))
        .collect();

    Ok(ChatOutcome { response, sources })
}

/// Passage texts, each prefixed by its parent document title.
fn build_context(results: &[RankedResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{}] {}", r.hit.document_title, r.hit.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_user_prompt(persona: &Persona, context: &str, query: &str) -> String {
    format!(
        "You are a guide for the Tiger Exhibition at the National Museum. Answer the user's question about Korean tiger art and culture based on the provided context.\n\
         \n\
         Context about the Tiger Exhibition:\n\
         {context}\n\
         \n\
         User Question: {query}\n\
         \n\
         Character:\n\
         - Name: {name}\n\
         - Personality: {personality}\n\
         - Voice: {voice}\n\
         - Example: \"{example}\"\n\
         \n\
         Guidelines:\n\
         - Be concise (2-3 sentences)\n\
         - Reference specific artworks, artists, or cultural elements when possible\n\
         - Focus on the connection between traditional Korean tiger art and modern interpretations\n\
         - If you don't find relevant information in the context, say you don't have specific information about that topic\n\
         - Always be helpful and encouraging about visiting the exhibition\n\
         - Answer in the language of the question and never invent facts beyond the context\n\
         \n\
         Response:",
        context = context,
        query = query,
        name = persona.display_name,
        personality = persona.personality,
        voice = persona.voice,
        example = persona.example,
    )
}

fn source_from(result: &RankedResult, rank: usize) -> SourceAttribution {
    let hit = &result.hit;
    SourceAttribution {
        source_locator: hit
            .source_url
            .clone()
            .unwrap_or_else(|| format!("Document: {}", hit.document_title)),
        content_preview: hit.text.chars().take(PREVIEW_CHARS).collect(),
        rank,
        similarity_score: round4(hit.similarity),
        document_title: hit.document_title.clone(),
        passage_id: hit.passage_id.clone(),
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
