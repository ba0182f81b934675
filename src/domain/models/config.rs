use serde::{Deserialize, Serialize};

/// Main configuration structure for taskloom
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Scheduling configuration
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Task snapshot persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// LLM collaborator used for decomposition and primary execution
    #[serde(default)]
    pub llm: LlmConfig,

    /// Agent discovery on GitHub
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Local fallback execution of agent code
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestrationConfig {
    /// Maximum subtasks running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Bound used instead of `concurrency` for resource-intensive tasks
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Advisory per-group estimate used for `ExecutionPlan::estimated_time`
    #[serde(default = "default_estimated_subtask_secs")]
    pub estimated_subtask_secs: u64,

    /// Shared keywords needed before a discovered agent is preferred over
    /// generating one
    #[serde(default = "default_min_keyword_overlap")]
    pub min_keyword_overlap: usize,
}

const fn default_concurrency() -> usize {
    5
}

const fn default_batch_concurrency() -> usize {
    3
}

const fn default_estimated_subtask_secs() -> u64 {
    30
}

const fn default_min_keyword_overlap() -> usize {
    2
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_concurrency: default_batch_concurrency(),
            estimated_subtask_secs: default_estimated_subtask_secs(),
            min_keyword_overlap: default_min_keyword_overlap(),
        }
    }
}

impl OrchestrationConfig {
    /// Concurrency bound for a task.
    pub fn concurrency_for(&self, resource_intensive: bool) -> usize {
        if resource_intensive {
            self.batch_concurrency
        } else {
            self.concurrency
        }
    }
}

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    Sqlite,
    Memory,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PersistenceConfig {
    #[serde(default = "default_backend")]
    pub backend: PersistenceBackend,

    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_backend() -> PersistenceBackend {
    PersistenceBackend::Sqlite
}

fn default_database_path() -> String {
    ".taskloom/taskloom.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
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

    /// Directory for rotated JSON log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Whether to also log to stdout
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Rotation policy: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_true() -> bool {
    true
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: default_true(),
            rotation: default_rotation(),
        }
    }
}

/// LLM collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (falls back to `ANTHROPIC_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Max tokens to generate per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Maximum retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_model() -> String {
    "claude-sonnet-4-5".to_string()
}

const fn default_llm_timeout_secs() -> u64 {
    120
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_requests_per_second() -> u32 {
    5
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            max_tokens: default_max_tokens(),
            requests_per_second: default_requests_per_second(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl LlmConfig {
    /// Get API key from config or environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

/// GitHub agent discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// API token (falls back to `GITHUB_TOKEN`)
    #[serde(default)]
    pub token: Option<String>,

    /// Repositories considered per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

const fn default_max_results() -> usize {
    5
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_github_base_url(),
            token: None,
            max_results: default_max_results(),
        }
    }
}

impl DiscoveryConfig {
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}

/// Sandbox execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SandboxConfig {
    /// Interpreter that receives agent code on stdin
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Kill the run after this many seconds
    #[serde(default = "default_sandbox_timeout_secs")]
    pub timeout_secs: u64,

    /// Captured output is truncated past this size
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

const fn default_sandbox_timeout_secs() -> u64 {
    30
}

const fn default_max_output_bytes() -> usize {
    64 * 1024
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_sandbox_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}
