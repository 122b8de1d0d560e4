//! # Guidely CLI (`guidely`)
//!
//! The `guidely` binary is the operational interface for the Tiger
//! Exhibition chatbot backend. It provides commands for database
//! initialization, document ingestion, document management, retrieval
//! debugging, and starting the HTTP server the kiosk frontend talks to.
//!
//! ## Usage
//!
//! ```bash
//! guidely --config ./guidely.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `guidely init` | Write a starter config and create the SQLite database |
//! | `guidely serve` | Start the HTTP API server |
//! | `guidely ingest file <path>` | Ingest one .txt/.md/.pdf file |
//! | `guidely ingest dir <path>` | Ingest every supported file under a directory |
//! | `guidely ingest text` | Ingest inline text from the command line |
//! | `guidely documents list` | List stored documents |
//! | `guidely documents show <id>` | Print one document with its passages |
//! | `guidely documents deactivate <id>` | Hide a document from search |
//! | `guidely documents delete <id>` | Hard-delete a document and its passages |
//! | `guidely documents rechunk <id>` | Re-chunk and re-embed a stored document |
//! | `guidely search "<query>"` | Run the retrieval pipeline and print rankings |
//! | `guidely ask "<query>"` | One full chat turn against a persona |
//!
//! ## Examples
//!
//! ```bash
//! # First-time setup
//! guidely init
//!
//! # Load the exhibition guide
//! guidely ingest file ./docs/tiger-exhibition.pdf --title "Tiger Exhibition Guide"
//! guidely ingest dir ./docs --include "*.md"
//!
//! # Inspect what retrieval would feed the model
//! guidely search "호랑이 그림"
//!
//! # Full pipeline, Rumi persona
//! guidely ask "Tell me about the tiger paintings" --persona rumi
//!
//! # Serve the kiosk API
//! guidely serve --host 0.0.0.0 --port 8000
//! ```

mod chunk;
mod config;
mod db;
mod embedding;
mod extract;
mod generate;
mod ingest;
mod lexicon;
mod llm;
mod migrate;
mod models;
mod personas;
mod relevance;
mod retrieval;
mod server;
mod store;
mod summarize;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::models::format_ts_iso;

/// Guidely CLI — the retrieval-augmented chatbot backend for the Tiger
/// Exhibition at the National Museum.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; `guidely init` writes a starter file with every default spelled
/// out.
#[derive(Parser)]
#[command(
    name = "guidely",
    about = "Guidely — retrieval-augmented chatbot backend for the Tiger Exhibition",
    version,
    long_about = "Guidely answers visitor questions about the Tiger Exhibition at the National \
    Museum. It ingests exhibition documents (text, markdown, PDF), chunks and embeds them into \
    SQLite, and serves persona-driven chat over HTTP: each question is gated for relevance, \
    grounded in retrieved passages, and answered in character with source attributions."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./guidely.toml`. Database, chunking, retrieval,
    /// embedding, LLM, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./guidely.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the config file and database.
    ///
    /// Writes a starter `guidely.toml` (unless one exists) and creates the
    /// SQLite database with all required tables. This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP API server.
    ///
    /// Serves the chat, summarize, and admin document endpoints until the
    /// process is terminated. Applies pending schema migrations on startup.
    Serve {
        /// Override the bind host from config.
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port from config.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ingest documents into the knowledge base.
    ///
    /// Each document is chunked, embedded through the configured provider,
    /// and stored in one transaction.
    Ingest {
        #[command(subcommand)]
        action: IngestAction,
    },

    /// Manage stored documents.
    Documents {
        #[command(subcommand)]
        action: DocumentsAction,
    },

    /// Run the retrieval pipeline and print the ranked candidates.
    ///
    /// Shows exactly what would be handed to the model for a given query:
    /// merged vector/keyword candidates with boosted scores and the final
    /// answer/refuse verdict.
    Search {
        /// The visitor question to search with.
        query: String,

        /// Maximum ranked passages to print (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Ask one question through the full chat pipeline.
    ///
    /// Runs relevance gating, retrieval, confidence gating, and persona
    /// generation, then prints the response with its sources.
    Ask {
        /// The visitor question.
        query: String,

        /// Persona to answer as: rumi, mira, zoey, jinu, or default.
        #[arg(long, default_value = "rumi")]
        persona: String,
    },
}

/// Ingestion subcommands.
#[derive(Subcommand)]
enum IngestAction {
    /// Ingest a single .txt, .md or .pdf file.
    File {
        /// Path to the file.
        path: PathBuf,

        /// Document title (defaults to the file stem).
        #[arg(long)]
        title: Option<String>,
    },

    /// Ingest every supported file under a directory.
    ///
    /// Walks the tree, skipping unsupported extensions. Files that fail to
    /// load or embed are skipped with a warning; the rest continue.
    Dir {
        /// Root directory to walk.
        path: PathBuf,

        /// Only ingest files whose relative path matches this glob
        /// (e.g. `*.md`, `guides/**`).
        #[arg(long)]
        include: Option<String>,
    },

    /// Ingest inline text.
    Text {
        /// Document title.
        #[arg(long)]
        title: String,

        /// Document content.
        #[arg(long)]
        content: String,
    },
}

/// Document management subcommands.
#[derive(Subcommand)]
enum DocumentsAction {
    /// List stored documents with passage counts.
    List {
        /// Include deactivated documents.
        #[arg(long)]
        all: bool,
    },

    /// Print one document's metadata and passages.
    Show {
        /// Document id.
        id: String,
    },

    /// Deactivate a document (soft delete).
    ///
    /// The document stays in the database and remains fetchable by id, but
    /// disappears from search and from the default listing.
    Deactivate {
        /// Document id.
        id: String,
    },

    /// Hard-delete a document. Its passages are removed with it.
    Delete {
        /// Document id.
        id: String,
    },

    /// Re-chunk and re-embed a document's stored content.
    ///
    /// Useful after changing chunking or embedding settings. The old
    /// passages are replaced atomically.
    Rechunk {
        /// Document id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("guidely=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Init must work before a config file exists
    if let Commands::Init = cli.command {
        if config::write_starter_config(&cli.config)? {
            println!("Wrote starter config to {}", cli.config.display());
        }
        let cfg = config::load_config(&cli.config)?;
        let pool = db::connect(&cfg).await?;
        migrate::run_migrations(&pool).await?;
        pool.close().await;
        println!("Database initialized at {}", cfg.db.path.display());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Serve { host, port } => {
            let mut cfg = cfg;
            if host.is_some() || port.is_some() {
                let (cfg_host, cfg_port) = split_bind(&cfg.server.bind);
                cfg.server.bind = format!(
                    "{}:{}",
                    host.unwrap_or(cfg_host),
                    port.map(|p| p.to_string()).unwrap_or(cfg_port)
                );
            }
            server::run_server(&cfg).await?;
        }
        Commands::Ingest { action } => {
            cmd_ingest(&cfg, action).await?;
        }
        Commands::Documents { action } => {
            cmd_documents(&cfg, action).await?;
        }
        Commands::Search { query, top_k } => {
            cmd_search(&cfg, &query, top_k).await?;
        }
        Commands::Ask { query, persona } => {
            cmd_ask(&cfg, &query, &persona).await?;
        }
    }

    Ok(())
}

fn split_bind(bind: &str) -> (String, String) {
    bind.split_once(':')
        .map(|(h, p)| (h.to_string(), p.to_string()))
        .unwrap_or_else(|| (bind.to_string(), "8000".to_string()))
}

async fn open_store(cfg: &Config) -> Result<SqlitePool> {
    let pool = db::connect(cfg).await?;
    migrate::run_migrations(&pool).await?;
    Ok(pool)
}

async fn cmd_ingest(cfg: &Config, action: IngestAction) -> Result<()> {
    let pool = open_store(cfg).await?;
    let provider = embedding::create_provider(&cfg.embedding)?;

    match action {
        IngestAction::File { path, title } => {
            let report = ingest::ingest_file(&pool, provider.as_ref(), cfg, &path, title).await?;
            print_ingest_report(&report);
        }
        IngestAction::Dir { path, include } => {
            let reports =
                ingest::ingest_dir(&pool, provider.as_ref(), cfg, &path, include.as_deref())
                    .await?;
            if reports.is_empty() {
                println!("No supported files found.");
            }
            for report in &reports {
                print_ingest_report(report);
            }
            println!("Ingested {} document(s).", reports.len());
        }
        IngestAction::Text { title, content } => {
            if content.trim().is_empty() {
                bail!("content must not be empty");
            }
            let document = models::Document::new(&title, &content);
            let report = ingest::ingest_document(&pool, provider.as_ref(), cfg, document).await?;
            print_ingest_report(&report);
        }
    }

    pool.close().await;
    Ok(())
}

fn print_ingest_report(report: &ingest::IngestReport) {
    println!(
        "{}  \"{}\" ({} passages)",
        report.document_id, report.title, report.passages_created
    );
}

async fn cmd_documents(cfg: &Config, action: DocumentsAction) -> Result<()> {
    let pool = open_store(cfg).await?;

    match action {
        DocumentsAction::List { all } => {
            let documents = store::list_documents(&pool, !all).await?;
            if documents.is_empty() {
                println!("No documents.");
            }
            for d in &documents {
                let state = if d.is_active { "active  " } else { "inactive" };
                println!(
                    "{}  {}  {}  \"{}\" ({} passages)",
                    d.id,
                    state,
                    format_ts_iso(d.created_at),
                    d.title,
                    d.passage_count
                );
            }
        }
        DocumentsAction::Show { id } => {
            let document = match store::get_document(&pool, &id).await? {
                Some(d) => d,
                None => {
                    pool.close().await;
                    bail!("document not found: {}", id);
                }
            };
            let passages = store::document_passages(&pool, &id).await?;

            println!("--- Document ---");
            println!("id:         {}", document.id);
            println!("title:      {}", document.title);
            println!("type:       {}", document.file_type);
            if let Some(ref name) = document.file_name {
                println!("file_name:  {}", name);
            }
            if let Some(ref url) = document.source_url {
                println!("source_url: {}", url);
            }
            println!("active:     {}", document.is_active);
            println!("created_at: {}", format_ts_iso(document.created_at));
            if let Some(ref meta) = document.metadata_json {
                println!("metadata:   {}", meta);
            }
            println!("content:    {} chars", document.content.chars().count());
            println!();

            println!("--- Passages ({}) ---", passages.len());
            for p in &passages {
                let embedded = if p.embedding.is_empty() {
                    "no embedding"
                } else {
                    "embedded"
                };
                println!(
                    "[passage {}] {} chars, {}",
                    p.passage_index,
                    p.text.chars().count(),
                    embedded
                );
            }
        }
        DocumentsAction::Deactivate { id } => {
            let mut document = match store::get_document(&pool, &id).await? {
                Some(d) => d,
                None => {
                    pool.close().await;
                    bail!("document not found: {}", id);
                }
            };
            document.is_active = false;
            store::update_document(&pool, &document).await?;
            println!("Deactivated {}.", id);
        }
        DocumentsAction::Delete { id } => {
            if store::delete_document(&pool, &id).await? {
                println!("Deleted {}.", id);
            } else {
                pool.close().await;
                bail!("document not found: {}", id);
            }
        }
        DocumentsAction::Rechunk { id } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let report = ingest::rechunk_document(&pool, provider.as_ref(), cfg, &id).await?;
            println!(
                "Re-chunked {} into {} passages.",
                report.document_id, report.passages_created
            );
        }
    }

    pool.close().await;
    Ok(())
}

async fn cmd_search(cfg: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    if !cfg.embedding.is_enabled() {
        bail!("Search requires embeddings. Set [embedding] provider in config.");
    }

    let mut retrieval_cfg = cfg.retrieval.clone();
    if let Some(k) = top_k {
        retrieval_cfg.top_k = k;
    }

    let pool = open_store(cfg).await?;
    let provider: Box<dyn EmbeddingProvider> = embedding::create_provider(&cfg.embedding)?;
    let lexicon = lexicon::Lexicon::from_config(&cfg.lexicon)?;

    let results =
        retrieval::retrieve(&pool, provider.as_ref(), &lexicon, &retrieval_cfg, query).await?;

    if results.is_empty() {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {}",
            i + 1,
            result.boosted_score,
            result.hit.document_title
        );
        println!(
            "    similarity: {:.4} / keyword matches: {}",
            result.hit.similarity, result.keyword_matches
        );
        if let Some(ref url) = result.hit.source_url {
            println!("    url: {}", url);
        }
        println!("    excerpt: \"{}\"", excerpt(&result.hit.text));
        println!(
            "    passage: {} / document: {}",
            result.hit.passage_id, result.hit.document_id
        );
        println!();
    }

    let verdict = retrieval::should_answer(&lexicon, &retrieval_cfg, query, &results);
    println!(
        "should answer: {}",
        if verdict {
            "yes"
        } else {
            "no (would reply with the persona's unknown line)"
        }
    );

    pool.close().await;
    Ok(())
}

async fn cmd_ask(cfg: &Config, query: &str, persona_key: &str) -> Result<()> {
    let persona = match personas::lookup(persona_key) {
        Some(p) => p,
        None => {
            let known: Vec<&str> = personas::all().iter().map(|p| p.key).collect();
            bail!(
                "Unknown persona: '{}'. Known personas: {}",
                persona_key,
                known.join(", ")
            );
        }
    };

    let pool = open_store(cfg).await?;
    let provider: Box<dyn EmbeddingProvider> = embedding::create_provider(&cfg.embedding)?;
    let llm_client = llm::create_client(&cfg.llm)?;
    let lexicon = lexicon::Lexicon::from_config(&cfg.lexicon)?;

    let outcome = generate::answer_chat(
        &pool,
        provider.as_ref(),
        llm_client.as_ref(),
        &lexicon,
        &cfg.retrieval,
        persona,
        query,
    )
    .await?;

    println!("{}", outcome.response);
    if !outcome.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &outcome.sources {
            println!(
                "  {}. [{:.4}] {} / {}",
                source.rank, source.similarity_score, source.document_title, source.source_locator
            );
        }
    }

    pool.close().await;
    Ok(())
}

/// One-line excerpt for terminal output, safe on multi-byte text.
fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let mut out: String = flat.trim().chars().take(160).collect();
    if flat.trim().chars().count() > 160 {
        out.push_str("...");
    }
    out
}
