// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

use crate::story::PromptTemplate;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub cors: CorsConfig,
    pub story: StoryConfig,
    pub rate_limit: RateLimitConfig,
    pub provider: ProviderConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// CORS header values sent on every response
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_headers: String,
    pub allow_methods: String,
}

/// Story endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoryConfig {
    /// Path the story handler is mounted on
    pub path: String,
    /// Liveness probe path, `None` or an empty string disables the probe
    #[serde(default)]
    pub health_path: Option<String>,
    pub template: PromptTemplate,
    /// Overrides the template's default model
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides the template's default output cap
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

/// Sliding-window rate limit configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// `None` falls back to the template's default
    #[serde(default)]
    pub enabled: Option<bool>,
    pub max_requests: usize,
    pub window_ms: i64,
}

/// Completion provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}
