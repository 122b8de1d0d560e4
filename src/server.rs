//! HTTP API for the exhibition chatbot.
//!
//! # Endpoints
//!
//! | Method   | Path                    | Description                        |
//! |----------|-------------------------|------------------------------------|
//! | `POST`   | `/rag/query`            | One chat turn with sources         |
//! | `POST`   | `/rag/summarize`        | End-of-session credit lines        |
//! | `POST`   | `/admin/documents/text` | Upload a raw text document         |
//! | `POST`   | `/admin/documents/pdf`  | Upload a base64-encoded PDF        |
//! | `GET`    | `/admin/documents`      | List documents                     |
//! | `DELETE` | `/admin/documents/{id}` | Deactivate a document              |
//! | `GET`    | `/`                     | Service banner                     |
//! | `GET`    | `/health`               | Fast liveness check                |
//! | `GET`    | `/health/detailed`      | Store and provider readiness       |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "unknown persona: 'bob'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Gate refusals and "I don't know" answers are NOT errors: they are 200
//! responses with canned text and an empty source list.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the kiosk frontend and
//! the admin panel are served from different origins than this API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::embedding::EmbeddingProvider;
use crate::extract;
use crate::generate::{self, ChatOutcome};
use crate::ingest;
use crate::lexicon::Lexicon;
use crate::llm::LlmClient;
use crate::migrate;
use crate::models::{format_ts_iso, Document};
use crate::personas;
use crate::store;
use crate::summarize::{self, ConversationMessage, SummaryReport};

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    lexicon: Arc<Lexicon>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
}

/// Starts the HTTP server.
///
/// Connects to the database, applies migrations, constructs the provider
/// clients once, and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let lexicon = Lexicon::from_config(&config.lexicon)?;
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::from(crate::embedding::create_provider(&config.embedding)?);
    let llm: Arc<dyn LlmClient> = Arc::from(crate::llm::create_client(&config.llm)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        lexicon: Arc::new(lexicon),
        embedder,
        llm,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/health/detailed", get(handle_health_detailed))
        .route("/rag/query", post(handle_chat))
        .route("/rag/summarize", post(handle_summarize))
        .route("/admin/documents/text", post(handle_upload_text))
        .route("/admin/documents/pdf", post(handle_upload_pdf))
        .route("/admin/documents", get(handle_list_documents))
        .route("/admin/documents/{id}", delete(handle_delete_document))
        .layer(cors)
        .with_state(state);

    println!("Guidely server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Handler error carrying the HTTP status and the JSON error contract.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Store and other unexpected failures. The chain is logged server-side;
/// the caller gets a generic body.
fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = ?err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal server error".to_string(),
    }
}

// ============ System routes ============

#[derive(Serialize)]
struct ServiceInfo {
    message: &'static str,
    status: &'static str,
    version: &'static str,
    health: &'static str,
}

async fn handle_root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Guidely RAG Service",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        health: "/health",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Fast liveness check for load balancers; no I/O.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "Guidely RAG Service",
    })
}

#[derive(Serialize)]
struct DetailedHealthResponse {
    status: &'static str,
    service: &'static str,
    store_ready: bool,
    embedding_model: String,
    llm_model: String,
    documents: i64,
    active_documents: i64,
    passages: i64,
    description: &'static str,
}

async fn handle_health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let (store_ready, stats) = match store::stats(&state.pool).await {
        Ok(stats) => (true, stats),
        Err(e) => {
            tracing::error!(error = %e, "health check store probe failed");
            (
                false,
                store::Stats {
                    documents: 0,
                    active_documents: 0,
                    passages: 0,
                },
            )
        }
    };

    Json(DetailedHealthResponse {
        status: if store_ready { "healthy" } else { "degraded" },
        service: "Guidely RAG Service",
        store_ready,
        embedding_model: state.embedder.model_name().to_string(),
        llm_model: state.llm.model_name().to_string(),
        documents: stats.documents,
        active_documents: stats.active_documents,
        passages: stats.passages,
        description: "Stateless RAG service for exhibition chatbot",
    })
}

// ============ POST /rag/query ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default = "default_persona")]
    character: String,
}

fn default_persona() -> String {
    "rumi".to_string()
}

/// One chat turn. Off-topic and ungrounded messages come back as 200 with
/// canned text; only unknown personas (400) and store failures (500) are
/// errors.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, AppError> {
    let persona = personas::lookup(&req.character)
        .ok_or_else(|| bad_request(format!("unknown persona: '{}'", req.character)))?;

    let outcome = generate::answer_chat(
        &state.pool,
        state.embedder.as_ref(),
        state.llm.as_ref(),
        &state.lexicon,
        &state.config.retrieval,
        persona,
        &req.message,
    )
    .await
    .map_err(internal)?;

    Ok(Json(outcome))
}

// ============ POST /rag/summarize ============

#[derive(Deserialize)]
struct SummarizeRequest {
    session_id: String,
    messages: Vec<ConversationMessage>,
    #[serde(default = "default_summary_count")]
    count: usize,
}

fn default_summary_count() -> usize {
    10
}

async fn handle_summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummaryReport>, AppError> {
    if req.count < 1 || req.count > 20 {
        return Err(bad_request("count must be between 1 and 20"));
    }

    let report = summarize::summarize_conversation(
        state.llm.as_ref(),
        &req.session_id,
        &req.messages,
        req.count,
    )
    .await;

    Ok(Json(report))
}

// ============ Admin document routes ============

#[derive(Deserialize)]
struct TextUploadRequest {
    title: String,
    content: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_upload_source")]
    source: String,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_upload_source() -> String {
    "admin_upload".to_string()
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    document_id: String,
    chunks_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted_text_length: Option<usize>,
}

async fn handle_upload_text(
    State(state): State<AppState>,
    Json(req): Json<TextUploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    if req.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    if req.content.trim().is_empty() {
        return Err(bad_request("content must not be empty"));
    }

    let mut document = Document::new(&req.title, &req.content);
    document.file_name = Some(format!("{}.txt", req.title));
    document.source_url = Some(format!("admin://text/{}", req.title));
    document.metadata_json = Some(
        serde_json::json!({
            "source": req.source,
            "category": req.category,
            "upload_type": "text",
        })
        .to_string(),
    );

    let report = ingest::ingest_document(
        &state.pool,
        state.embedder.as_ref(),
        &state.config,
        document,
    )
    .await
    .map_err(internal)?;

    Ok(Json(UploadResponse {
        success: true,
        message: "Text document uploaded successfully.".to_string(),
        document_id: report.document_id,
        chunks_created: report.passages_created,
        extracted_text_length: None,
    }))
}

async fn handle_upload_pdf(
    State(state): State<AppState>,
    Json(req): Json<TextUploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    if req.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }

    let bytes = BASE64
        .decode(req.content.as_bytes())
        .map_err(|e| bad_request(format!("invalid base64 payload: {}", e)))?;

    // Both malformed PDFs and text-free scans are client data errors
    let text = extract::extract_pdf(&bytes).map_err(|e| bad_request(e.to_string()))?;
    let extracted_chars = text.chars().count();

    let file_name = format!("{}.pdf", req.title);
    let mut document = Document::new(&req.title, &text);
    document.file_type = "pdf".to_string();
    document.file_name = Some(file_name.clone());
    document.source_url = Some(format!("admin://pdf/{}", file_name));
    document.metadata_json = Some(
        serde_json::json!({
            "source": req.source,
            "category": req.category,
            "upload_type": "pdf",
            "original_filename": file_name,
        })
        .to_string(),
    );

    let report = ingest::ingest_document(
        &state.pool,
        state.embedder.as_ref(),
        &state.config,
        document,
    )
    .await
    .map_err(internal)?;

    Ok(Json(UploadResponse {
        success: true,
        message: "PDF document uploaded successfully.".to_string(),
        document_id: report.document_id,
        chunks_created: report.passages_created,
        extracted_text_length: Some(extracted_chars),
    }))
}

#[derive(Deserialize)]
struct ListDocumentsQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Serialize)]
struct DocumentsResponse {
    success: bool,
    documents: Vec<DocumentSummary>,
}

#[derive(Serialize)]
struct DocumentSummary {
    id: String,
    title: String,
    file_type: String,
    is_active: bool,
    created_at: String,
    passage_count: i64,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let documents = store::list_documents(&state.pool, !query.include_inactive)
        .await
        .map_err(internal)?;

    Ok(Json(DocumentsResponse {
        success: true,
        documents: documents
            .into_iter()
            .map(|d| DocumentSummary {
                id: d.id,
                title: d.title,
                file_type: d.file_type,
                is_active: d.is_active,
                created_at: format_ts_iso(d.created_at),
                passage_count: d.passage_count,
            })
            .collect(),
    }))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    message: String,
}

/// Soft delete: the document stays fetchable by id but disappears from
/// both search paths and the default listing.
async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let mut document = store::get_document(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("document not found: {}", id)))?;

    document.is_active = false;
    let updated = store::update_document(&state.pool, &document)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found(format!("document not found: {}", id)));
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Document {} deactivated.", id),
    }))
}
