use anyhow::Result;
use sqlx::SqlitePool;

/// Schema DDL, in dependency order. Every statement is `IF NOT EXISTS` so
/// the whole set is safe to run on every startup.
///
/// The `passages.embedding` column holds little-endian f32 bytes; NULL
/// means the passage was ingested with embeddings disabled.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        file_name TEXT,
        file_type TEXT NOT NULL DEFAULT 'text',
        source_url TEXT,
        content TEXT NOT NULL,
        metadata_json TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS passages (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        passage_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB,
        metadata_json TEXT,
        created_at INTEGER NOT NULL,
        UNIQUE(document_id, passage_index),
        FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_passages_document_id ON passages(document_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_is_active ON documents(is_active)",
    "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at DESC)",
];

/// Create the schema if it does not exist.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
