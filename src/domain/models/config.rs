use serde::{Deserialize, Serialize};

/// Main configuration structure for genagent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Knowledge store configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Agent runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Model provider endpoints and credentials
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// YAML file holding agent and tool configurations
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

fn default_catalog_path() -> String {
    ".genagent/catalog.yaml".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".genagent/knowledge.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Vector backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackendKind {
    Memory,
    #[default]
    Sqlite,
}

/// Knowledge store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KnowledgeConfig {
    /// Where chunk vectors are stored
    #[serde(default)]
    pub backend: VectorBackendKind,

    /// Target chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Documents retrieved per agent query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Bound on each embedding or backend call
    #[serde(default = "default_knowledge_timeout")]
    pub timeout_secs: u64,

    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_chunk_overlap() -> usize {
    200
}

const fn default_top_k() -> usize {
    5
}

const fn default_knowledge_timeout() -> u64 {
    30
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackendKind::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            timeout_secs: default_knowledge_timeout(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider: hashing (local, deterministic) or openai
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Embedding model name for remote providers
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Override of the provider base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (falls back to `OPENAI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_embedding_provider() -> String {
    "hashing".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimension() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Agent runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Bound on one model conversation turn, tool rounds included
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    /// Tool-call rounds allowed before a turn is abandoned
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Conversation retention policy
    #[serde(default)]
    pub memory: MemoryConfig,
}

const fn default_model_timeout() -> u64 {
    120
}

const fn default_max_tool_rounds() -> usize {
    5
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_timeout_secs: default_model_timeout(),
            max_tool_rounds: default_max_tool_rounds(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Conversation retention policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Threads kept per agent; least recently used are evicted
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Messages kept per thread; oldest are trimmed
    #[serde(default = "default_max_messages")]
    pub max_messages_per_thread: usize,

    /// Idle threads older than this are purged (0 disables)
    #[serde(default)]
    pub idle_ttl_secs: u64,
}

const fn default_max_threads() -> usize {
    1000
}

const fn default_max_messages() -> usize {
    200
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            max_messages_per_thread: default_max_messages(),
            idle_ttl_secs: 0,
        }
    }
}

/// Model provider endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProvidersConfig {
    /// OpenAI endpoint
    #[serde(default = "default_openai")]
    pub openai: ProviderEndpoint,

    /// Anthropic endpoint
    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderEndpoint,

    /// Ollama (OpenAI-compatible) endpoint
    #[serde(default = "default_ollama")]
    pub ollama: ProviderEndpoint,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            anthropic: default_anthropic(),
            ollama: default_ollama(),
        }
    }
}

fn default_openai() -> ProviderEndpoint {
    ProviderEndpoint::new("https://api.openai.com/v1")
}

fn default_anthropic() -> ProviderEndpoint {
    ProviderEndpoint::new("https://api.anthropic.com")
}

fn default_ollama() -> ProviderEndpoint {
    ProviderEndpoint::new("http://localhost:11434/v1")
}

/// Base URL and optional key of a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderEndpoint {
    /// Base URL of the API
    pub base_url: String,

    /// API key used when the agent has no credentials reference
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }
}
