//! # Guidely
//!
//! Retrieval-augmented chatbot backend for the Tiger Exhibition at the
//! National Museum.
//!
//! Guidely ingests exhibition documents (text, markdown, PDF), chunks and
//! embeds them into SQLite, and answers visitor questions over HTTP: each
//! question is gated for exhibition relevance, grounded in retrieved
//! passages, and answered by a docent persona with source attributions.
//! Questions the corpus cannot support get an in-character "I don't know"
//! instead of a hallucinated answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Documents  │──▶│  Pipeline   │──▶│  SQLite  │
//! │ txt/md/pdf  │   │ Chunk+Embed │   │ passages │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │(guidely) │       │  (axum)  │
//!                 └──────────┘       └────┬─────┘
//!                                         │
//!              relevance gate ─▶ hybrid search ─▶ re-rank
//!                     ─▶ confidence gate ─▶ persona LLM
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! guidely init                        # write config, create database
//! guidely ingest dir ./docs           # chunk + embed exhibition documents
//! guidely search "호랑이 그림"         # inspect retrieval rankings
//! guidely ask "Tell me about 호작도"   # one chat turn from the terminal
//! guidely serve                       # start the kiosk-facing HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Character-window text chunking |
//! | [`extract`] | PDF text extraction |
//! | [`ingest`] | Chunk, embed and store documents |
//! | [`lexicon`] | Korean exhibition vocabulary |
//! | [`relevance`] | Exhibition-topic gate |
//! | [`retrieval`] | Hybrid search, merge, re-rank, confidence gate |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Chat-completion client |
//! | [`personas`] | Docent characters and canned lines |
//! | [`generate`] | Grounded answer assembly |
//! | [`summarize`] | End-of-session credit lines |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema migrations |
//! | [`store`] | SQLite access layer |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod lexicon;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod personas;
pub mod relevance;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod summarize;
