use serde::{Deserialize, Serialize};

/// Main configuration structure for provost
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inbound HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM provider selection
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval index settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// External district data service the agents call
    #[serde(default)]
    pub data_service: DataServiceConfig,

    /// Planning and execution knobs
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Rule catalog source
    #[serde(default)]
    pub rules: RulesConfig,
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
    ".provost/provost.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
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

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default = "default_true")]
    pub enable_stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            enable_stdout: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8088
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// No model calls; agents answer with deterministic text
    #[default]
    Offline,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
    Anthropic,
}

impl LlmProvider {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Anthropic => "anthropic",
        }
    }

    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Offline => "",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    /// Optional YAML file merged over this section at load time
    #[serde(default)]
    pub config_path: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Falls back to the provider's usual env var when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_llm_timeout_secs() -> u64 {
    60
}

const fn default_llm_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            config_path: None,
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

/// Embedding backends for the retrieval index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    #[default]
    Hashing,
    #[serde(rename = "openai")]
    OpenAi,
}

/// Retrieval index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Directory holding one `<index>.json` file per index
    #[serde(default = "default_index_dir")]
    pub index_dir: String,

    #[serde(default = "default_index")]
    pub default_index: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub embedder: EmbedderKind,

    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
}

fn default_index_dir() -> String {
    ".provost/indexes".to_string()
}

fn default_index() -> String {
    "district".to_string()
}

const fn default_top_k() -> usize {
    5
}

const fn default_embedding_dimension() -> usize {
    256
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            default_index: default_index(),
            top_k: default_top_k(),
            embedder: EmbedderKind::default(),
            embedding_dimension: default_embedding_dimension(),
        }
    }
}

/// External student/staff data service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataServiceConfig {
    /// Entity and data-query agents are only registered when set
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_data_timeout_secs")]
    pub timeout_secs: u64,

    /// Entities exposed as list-endpoint agents
    #[serde(default = "default_entities")]
    pub entities: Vec<String>,
}

const fn default_data_timeout_secs() -> u64 {
    10
}

fn default_entities() -> Vec<String> {
    [
        "students",
        "staff",
        "incidents",
        "attendance",
        "enrollment",
        "transportation",
        "facilities",
        "finance",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_data_timeout_secs(),
            entities: default_entities(),
        }
    }
}

/// Orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestrationConfig {
    /// Per-attempt timeout for one agent invocation
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff step between attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum agents in a fan-out plan, winner included
    #[serde(default = "default_fan_out_max")]
    pub fan_out_max: usize,

    /// Alternatives below this confidence never join a fan-out
    #[serde(default = "default_fan_out_min_confidence")]
    pub fan_out_min_confidence: f64,

    #[serde(default = "default_fallback_agent")]
    pub fallback_agent: String,

    /// User/assistant pairs kept in checkpointed history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Explicit command prefix that locks routing to the data-query agent
    #[serde(default = "default_query_prefix")]
    pub query_prefix: String,
}

const fn default_agent_timeout_ms() -> u64 {
    30_000
}

const fn default_max_retries() -> u32 {
    1
}

const fn default_retry_backoff_ms() -> u64 {
    250
}

const fn default_fan_out_max() -> usize {
    3
}

const fn default_fan_out_min_confidence() -> f64 {
    0.8
}

fn default_fallback_agent() -> String {
    "general".to_string()
}

const fn default_history_limit() -> usize {
    10
}

fn default_query_prefix() -> String {
    "query ".to_string()
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            agent_timeout_ms: default_agent_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            fan_out_max: default_fan_out_max(),
            fan_out_min_confidence: default_fan_out_min_confidence(),
            fallback_agent: default_fallback_agent(),
            history_limit: default_history_limit(),
            query_prefix: default_query_prefix(),
        }
    }
}

/// Rule catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RulesConfig {
    /// YAML catalog; the embedded default catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<String>,
}
