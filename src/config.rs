use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("guidely.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum passage length in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Characters shared between consecutive passages.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap: default_overlap(),
        }
    }
}

fn default_max_chars() -> usize {
    1200
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidates returned by each search arm before merging.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    /// Vector candidates must score strictly above this.
    #[serde(default = "default_vector_floor")]
    pub vector_floor: f64,
    /// Flat similarity assigned to keyword hits.
    #[serde(default = "default_keyword_score")]
    pub keyword_score: f64,
    /// Boost added per distinct matched query keyword.
    #[serde(default = "default_boost_per_match")]
    pub boost_per_match: f64,
    /// Ceiling on the total keyword boost.
    #[serde(default = "default_boost_cap")]
    pub boost_cap: f64,
    /// Passages handed to the generator after ranking.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// The best raw similarity must reach this, or the question is
    /// answered with the persona's "I don't know" line.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_limit: default_candidate_limit(),
            vector_floor: default_vector_floor(),
            keyword_score: default_keyword_score(),
            boost_per_match: default_boost_per_match(),
            boost_cap: default_boost_cap(),
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
        }
    }
}

fn default_candidate_limit() -> usize {
    10
}
fn default_vector_floor() -> f64 {
    0.0
}
fn default_keyword_score() -> f64 {
    0.9
}
fn default_boost_per_match() -> f64 {
    0.15
}
fn default_boost_cap() -> f64 {
    0.6
}
fn default_top_k() -> usize {
    5
}
fn default_min_similarity() -> f64 {
    0.6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LexiconConfig {
    /// Optional TOML file overriding the built-in vocabulary tables.
    pub file: Option<PathBuf>,
}

/// Starter configuration written by `guidely init`. Every value shown is
/// the built-in default; the file parses to the same config when untouched.
const STARTER_CONFIG: &str = r#"# Guidely configuration.
# The OpenAI API key is read from the OPENAI_API_KEY environment variable,
# never from this file.

[db]
path = "guidely.db"

[chunking]
max_chars = 1200
overlap = 200

[retrieval]
candidate_limit = 10
vector_floor = 0.0
keyword_score = 0.9
boost_per_match = 0.15
boost_cap = 0.6
top_k = 5
min_similarity = 0.6

[embedding]
# "openai" or "disabled" (keyword search only)
provider = "openai"
model = "text-embedding-3-small"
dims = 384
base_url = "https://api.openai.com/v1"
max_retries = 3
timeout_secs = 30

[llm]
model = "gpt-4o"
temperature = 0.7
base_url = "https://api.openai.com/v1"
max_retries = 3
timeout_secs = 60

[server]
bind = "127.0.0.1:8000"

# Uncomment to override the built-in Korean vocabulary tables.
# [lexicon]
# file = "lexicon.toml"
"#;

/// Write the starter config unless `path` already exists. Returns true
/// when a file was written.
pub fn write_starter_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, STARTER_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap >= config.chunking.max_chars {
        anyhow::bail!(
            "chunking.overlap ({}) must be < chunking.max_chars ({})",
            config.chunking.overlap,
            config.chunking.max_chars
        );
    }

    // Validate retrieval
    if config.retrieval.candidate_limit == 0 {
        anyhow::bail!("retrieval.candidate_limit must be >= 1");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.min_similarity) {
        anyhow::bail!("retrieval.min_similarity must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.keyword_score) {
        anyhow::bail!("retrieval.keyword_score must be in [0.0, 1.0]");
    }
    if config.retrieval.boost_per_match < 0.0 {
        anyhow::bail!("retrieval.boost_per_match must be >= 0.0");
    }
    if config.retrieval.boost_cap < 0.0 {
        anyhow::bail!("retrieval.boost_cap must be >= 0.0");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or disabled.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.dims == 0 {
            anyhow::bail!("embedding.dims must be > 0");
        }
        if config.embedding.model.is_empty() {
            anyhow::bail!("embedding.model must not be empty");
        }
    }

    // Validate llm
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}
