//! Document ingestion: chunk, embed, store.
//!
//! Chunking and embedding happen before any database write, so a provider
//! failure never leaves a document row without its passages. With
//! embeddings disabled the passages are stored without vectors and only
//! keyword search will see them.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::SqlitePool;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::extract;
use crate::models::{Document, Passage};
use crate::store;

#[derive(Debug)]
pub struct IngestReport {
    pub document_id: String,
    pub title: String,
    pub passages_created: usize,
}

/// Chunk, embed and store a prepared document in one transaction.
pub async fn ingest_document(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    document: Document,
) -> Result<IngestReport> {
    let passages = build_passages(provider, config, &document).await?;

    let report = IngestReport {
        document_id: document.id.clone(),
        title: document.title.clone(),
        passages_created: passages.len(),
    };

    store::insert_document_with_passages(pool, &document, &passages).await?;

    tracing::info!(
        document_id = %report.document_id,
        title = %report.title,
        passages = report.passages_created,
        "document ingested"
    );

    Ok(report)
}

/// Re-chunk and re-embed a stored document in place.
///
/// Picks up chunking or embedding config changes without touching the
/// document row itself. The old passages are swapped out atomically.
pub async fn rechunk_document(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    id: &str,
) -> Result<IngestReport> {
    let document = store::get_document(pool, id)
        .await?
        .with_context(|| format!("No document with id '{}'", id))?;

    let passages = build_passages(provider, config, &document).await?;

    let report = IngestReport {
        document_id: document.id.clone(),
        title: document.title.clone(),
        passages_created: passages.len(),
    };

    store::replace_passages(pool, &document.id, &passages).await?;

    tracing::info!(
        document_id = %report.document_id,
        passages = report.passages_created,
        "document re-chunked"
    );

    Ok(report)
}

/// Chunk a document's content and embed the chunks, without writing
/// anything. Failures here leave the store untouched.
async fn build_passages(
    provider: &dyn EmbeddingProvider,
    config: &Config,
    document: &Document,
) -> Result<Vec<Passage>> {
    let slices = chunk_text(
        &document.content,
        config.chunking.max_chars,
        config.chunking.overlap,
    );
    if slices.is_empty() {
        bail!("Document '{}' has no chunkable content", document.title);
    }

    let embeddings = if config.embedding.is_enabled() {
        let vectors = provider
            .embed(&slices)
            .await
            .with_context(|| format!("Failed to embed document '{}'", document.title))?;
        if vectors.len() != slices.len() {
            bail!(
                "Embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                slices.len()
            );
        }
        vectors
    } else {
        tracing::warn!(
            title = %document.title,
            "embeddings disabled, passages will only match keyword search"
        );
        vec![Vec::new(); slices.len()]
    };

    Ok(slices
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (text, embedding))| Passage::new(&document.id, i as i64, text, embedding))
        .collect())
}

/// Ingest a single .txt, .md or .pdf file.
pub async fn ingest_file(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    path: &Path,
    title: Option<String>,
) -> Result<IngestReport> {
    let (content, file_type) = load_file(path)?;

    let title = title.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    });

    let mut document = Document::new(&title, &content);
    document.file_type = file_type.to_string();
    document.file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    document.source_url = Some(format!("file://{}", path.display()));

    ingest_document(pool, provider, config, document).await
}

/// Walk a directory and ingest every supported file.
///
/// Files that fail to load or embed are skipped with a warning; the rest
/// of the walk continues.
pub async fn ingest_dir(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    root: &Path,
    include: Option<&str>,
) -> Result<Vec<IngestReport>> {
    if !root.exists() {
        bail!("Directory does not exist: {}", root.display());
    }

    let include_set = include.map(build_globset).transpose()?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if let Some(set) = &include_set {
            if !set.is_match(relative) {
                continue;
            }
        }
        if !is_supported(path) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    paths.sort();

    let mut reports = Vec::new();
    for path in paths {
        match ingest_file(pool, provider, config, &path, None).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping file");
            }
        }
    }

    Ok(reports)
}

fn load_file(path: &Path) -> Result<(String, &'static str)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = extract::extract_pdf(&bytes)
                .with_context(|| format!("Failed to extract text from {}", path.display()))?;
            Ok((text, "pdf"))
        }
        "txt" | "md" => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((content, "text"))
        }
        other => bail!(
            "Unsupported file type '{}' for {} (expected .txt, .md or .pdf)",
            other,
            path.display()
        ),
    }
}

fn is_supported(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str(),
        "txt" | "md" | "pdf"
    )
}

fn build_globset(pattern: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new(pattern)?);
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all("호랑이 전시 안내".as_bytes())
            .unwrap();
        let (content, file_type) = load_file(&path).unwrap();
        assert_eq!(content, "호랑이 전시 안내");
        assert_eq!(file_type, "text");
    }

    #[test]
    fn test_load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.docx");
        std::fs::File::create(&path).unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_load_garbage_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"not a pdf")
            .unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("a/b/guide.txt")));
        assert!(is_supported(Path::new("guide.MD")));
        assert!(is_supported(Path::new("guide.pdf")));
        assert!(!is_supported(Path::new("guide.html")));
        assert!(!is_supported(Path::new("Makefile")));
    }
}
