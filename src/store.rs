//! SQLite access layer for documents and passages.
//!
//! All queries that feed retrieval run against active documents only.
//! Deactivated documents stay in the database (and remain fetchable by id)
//! but are invisible to both search paths.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Document, Passage, SearchResult};

/// Insert a document and its passages in one transaction.
///
/// Either everything lands or nothing does; a failed embedding run can never
/// leave a half-ingested document behind.
pub async fn insert_document_with_passages(
    pool: &SqlitePool,
    document: &Document,
    passages: &[Passage],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO documents (id, title, file_name, file_type, source_url, content, metadata_json, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&document.id)
    .bind(&document.title)
    .bind(&document.file_name)
    .bind(&document.file_type)
    .bind(&document.source_url)
    .bind(&document.content)
    .bind(&document.metadata_json)
    .bind(document.is_active)
    .bind(document.created_at)
    .execute(&mut *tx)
    .await?;

    for passage in passages {
        let blob = if passage.embedding.is_empty() {
            None
        } else {
            Some(vec_to_blob(&passage.embedding))
        };
        sqlx::query(
            r#"
            INSERT INTO passages (id, document_id, passage_index, text, embedding, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&passage.id)
        .bind(&passage.document_id)
        .bind(passage.passage_index)
        .bind(&passage.text)
        .bind(blob)
        .bind(&passage.metadata_json)
        .bind(passage.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, file_name, file_type, source_url, content, metadata_json, is_active, created_at
        FROM documents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Document {
        id: r.get("id"),
        title: r.get("title"),
        file_name: r.get("file_name"),
        file_type: r.get("file_type"),
        source_url: r.get("source_url"),
        content: r.get("content"),
        metadata_json: r.get("metadata_json"),
        is_active: r.get("is_active"),
        created_at: r.get("created_at"),
    }))
}

/// One row of the admin document listing.
#[derive(Debug, Clone)]
pub struct DocumentOverview {
    pub id: String,
    pub title: String,
    pub file_type: String,
    pub is_active: bool,
    pub created_at: i64,
    pub passage_count: i64,
}

/// Documents, newest first, with their passage counts. With `active_only`
/// the soft-deleted ones are hidden, matching what visitors can search.
pub async fn list_documents(pool: &SqlitePool, active_only: bool) -> Result<Vec<DocumentOverview>> {
    let filter = if active_only { "WHERE d.is_active = 1" } else { "" };
    let sql = format!(
        r#"
        SELECT d.id, d.title, d.file_type, d.is_active, d.created_at,
               COUNT(p.id) AS passage_count
        FROM documents d
        LEFT JOIN passages p ON p.document_id = d.id
        {filter}
        GROUP BY d.id
        ORDER BY d.created_at DESC, d.id
        "#
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|r| DocumentOverview {
            id: r.get("id"),
            title: r.get("title"),
            file_type: r.get("file_type"),
            is_active: r.get("is_active"),
            created_at: r.get("created_at"),
            passage_count: r.get("passage_count"),
        })
        .collect())
}

/// Rewrite a document row in place. Soft-deletion goes through here too:
/// fetch, flip `is_active`, update. Returns false when no such document
/// exists.
pub async fn update_document(pool: &SqlitePool, document: &Document) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET title = ?, file_name = ?, file_type = ?, source_url = ?,
            content = ?, metadata_json = ?, is_active = ?
        WHERE id = ?
        "#,
    )
    .bind(&document.title)
    .bind(&document.file_name)
    .bind(&document.file_type)
    .bind(&document.source_url)
    .bind(&document.content)
    .bind(&document.metadata_json)
    .bind(document.is_active)
    .bind(&document.id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Hard delete. Passages go with the document via the foreign key cascade.
/// Returns false when no such document exists.
pub async fn delete_document(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace a document's passages in one transaction. Used when a document
/// is re-chunked after a chunking or embedding change.
pub async fn replace_passages(
    pool: &SqlitePool,
    document_id: &str,
    passages: &[Passage],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM passages WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for passage in passages {
        let blob = if passage.embedding.is_empty() {
            None
        } else {
            Some(vec_to_blob(&passage.embedding))
        };
        sqlx::query(
            r#"
            INSERT INTO passages (id, document_id, passage_index, text, embedding, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&passage.id)
        .bind(&passage.document_id)
        .bind(passage.passage_index)
        .bind(&passage.text)
        .bind(blob)
        .bind(&passage.metadata_json)
        .bind(passage.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn document_passages(pool: &SqlitePool, document_id: &str) -> Result<Vec<Passage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, passage_index, text, embedding, metadata_json, created_at
        FROM passages
        WHERE document_id = ?
        ORDER BY passage_index
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Passage {
            id: r.get("id"),
            document_id: r.get("document_id"),
            passage_index: r.get("passage_index"),
            text: r.get("text"),
            embedding: r
                .get::<Option<Vec<u8>>, _>("embedding")
                .map(|b| blob_to_vec(&b))
                .unwrap_or_default(),
            metadata_json: r.get("metadata_json"),
            created_at: r.get("created_at"),
        })
        .collect())
}

#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub documents: i64,
    pub active_documents: i64,
    pub passages: i64,
}

pub async fn stats(pool: &SqlitePool) -> Result<Stats> {
    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    let active_documents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_active = 1")
            .fetch_one(pool)
            .await?;
    let passages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
        .fetch_one(pool)
        .await?;
    Ok(Stats {
        documents,
        active_documents,
        passages,
    })
}

/// Brute-force cosine scan over every embedded passage of active documents.
///
/// Candidates must score strictly above `floor`; at the default floor of 0.0
/// this drops orthogonal-or-worse passages rather than padding the candidate
/// set with noise. Results come back best-first, at most `limit` of them.
pub async fn vector_candidates(
    pool: &SqlitePool,
    query_embedding: &[f32],
    limit: usize,
    floor: f64,
) -> Result<Vec<SearchResult>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.document_id, p.text, p.embedding, p.metadata_json,
               d.title AS document_title, d.source_url
        FROM passages p
        JOIN documents d ON d.id = p.document_id
        WHERE d.is_active = 1 AND p.embedding IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut results: Vec<SearchResult> = Vec::new();
    for row in &rows {
        let blob: Vec<u8> = row.get("embedding");
        let embedding = blob_to_vec(&blob);
        let similarity = cosine_similarity(query_embedding, &embedding) as f64;
        if similarity <= floor {
            continue;
        }
        results.push(SearchResult {
            passage_id: row.get("id"),
            document_id: row.get("document_id"),
            text: row.get("text"),
            similarity,
            metadata: parse_metadata(row.get::<Option<String>, _>("metadata_json").as_deref()),
            document_title: row.get("document_title"),
            source_url: row.get("source_url"),
        });
    }

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    Ok(results)
}

/// Substring search over passages of active documents.
///
/// A passage matches if it contains any of `terms`. ASCII terms match
/// case-insensitively (SQLite's `lower()` folds ASCII only, which leaves
/// Korean text untouched). Every hit gets the same flat `score`; ordering by
/// passage id keeps the result deterministic. No terms, no query: the caller
/// gets an empty set rather than a full scan.
pub async fn keyword_candidates(
    pool: &SqlitePool,
    terms: &[String],
    score: f64,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let clause = vec!["instr(lower(p.text), ?) > 0"; terms.len()].join(" OR ");
    let sql = format!(
        r#"
        SELECT p.id, p.document_id, p.text, p.metadata_json,
               d.title AS document_title, d.source_url
        FROM passages p
        JOIN documents d ON d.id = p.document_id
        WHERE d.is_active = 1 AND ({clause})
        ORDER BY p.id
        LIMIT ?
        "#
    );

    let mut query = sqlx::query(&sql);
    for term in terms {
        query = query.bind(term.to_lowercase());
    }
    query = query.bind(limit as i64);
    let rows = query
        .fetch_all(pool)
        .await
        .context("keyword search failed")?;

    Ok(rows
        .iter()
        .map(|row| SearchResult {
            passage_id: row.get("id"),
            document_id: row.get("document_id"),
            text: row.get("text"),
            similarity: score,
            metadata: parse_metadata(row.get::<Option<String>, _>("metadata_json").as_deref()),
            document_title: row.get("document_title"),
            source_url: row.get("source_url"),
        })
        .collect())
}

/// Decode stored metadata. Malformed JSON is logged and treated as absent
/// rather than failing the whole search.
fn parse_metadata(raw: Option<&str>) -> Option<serde_json::Value> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("discarding malformed passage metadata: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parses_valid_json() {
        let value = parse_metadata(Some(r#"{"chunk_length": 42}"#)).unwrap();
        assert_eq!(value["chunk_length"], 42);
    }

    #[test]
    fn test_malformed_metadata_becomes_none() {
        assert!(parse_metadata(Some("{not json")).is_none());
        assert!(parse_metadata(None).is_none());
    }
}
