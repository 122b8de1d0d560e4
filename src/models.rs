//! Core data models for the exhibition knowledge base.
//!
//! These types represent the documents, passages, and search results that
//! flow through the ingestion and retrieval pipeline.

use uuid::Uuid;

/// An ingested source document stored in SQLite.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_name: Option<String>,
    /// `"text"` or `"pdf"`.
    pub file_type: String,
    /// Original URL, or a synthetic `admin://` locator for admin uploads.
    pub source_url: Option<String>,
    pub content: String,
    pub metadata_json: Option<String>,
    /// Inactive documents are invisible to search but still fetchable by id.
    pub is_active: bool,
    pub created_at: i64,
}

impl Document {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            file_name: None,
            file_type: "text".to_string(),
            source_url: None,
            content: content.to_string(),
            metadata_json: None,
            is_active: true,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A contiguous, embedded slice of a document's text.
///
/// `passage_index` is unique per document and reflects left-to-right order
/// in the source text. Consecutive passages overlap by design; they are
/// deduplicated at query time by id, never by text.
#[derive(Debug, Clone)]
pub struct Passage {
    pub id: String,
    pub document_id: String,
    pub passage_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata_json: Option<String>,
    pub created_at: i64,
}

impl Passage {
    pub fn new(document_id: &str, index: i64, text: &str, embedding: Vec<f32>) -> Self {
        let metadata = serde_json::json!({ "chunk_length": text.chars().count() });
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            passage_index: index,
            text: text.to_string(),
            embedding,
            metadata_json: Some(metadata.to_string()),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A query-time projection of a passage hit. Not persisted.
///
/// `similarity` is in `[0, 1]` with 1.0 meaning identical: cosine similarity
/// for vector hits, the configured flat score for keyword hits.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub passage_id: String,
    pub document_id: String,
    pub text: String,
    pub similarity: f64,
    pub metadata: Option<serde_json::Value>,
    pub document_title: String,
    pub source_url: Option<String>,
}

/// A merged candidate after keyword-boost re-ranking.
///
/// `boosted_score` orders results; the raw `hit.similarity` is what the
/// confidence gate inspects and what callers see as the similarity score.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub hit: SearchResult,
    /// Distinct query keywords found in this passage's text.
    pub keyword_matches: usize,
    pub boosted_score: f64,
}

/// Format a Unix timestamp as ISO 8601.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
