// Configuration module entry point
// Manages application configuration and runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::{handler_config, AppState, StartupError};
pub use types::{Config, CorsConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from "config.toml" (or another supported extension) in the working directory
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("STORY").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 60)?
            .set_default("performance.write_timeout", 60)?
            .set_default("http.server_name", "recipe-story/0.1")?
            .set_default("http.max_body_size", 65_536)?
            .set_default("cors.allow_origin", "https://bkgoksel.github.io")?
            .set_default("cors.allow_headers", "Content-Type")?
            .set_default("cors.allow_methods", "POST, OPTIONS")?
            .set_default("story.path", "/generate_story")?
            .set_default("story.health_path", "/healthz")?
            .set_default("story.template", "continuation")?
            .set_default("rate_limit.max_requests", 10)?
            .set_default("rate_limit.window_ms", 60_000)?
            .set_default("provider.base_url", "https://api.openai.com/v1")?
            .set_default("provider.api_key_env", "OPENAI_API_KEY")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Whether the rate limiter gates the story endpoint
    pub fn rate_limit_enabled(&self) -> bool {
        self.rate_limit
            .enabled
            .unwrap_or_else(|| self.story.template.rate_limited_by_default())
    }

    /// Model identifier sent to the provider
    pub fn model(&self) -> String {
        self.story
            .model
            .clone()
            .unwrap_or_else(|| self.story.template.default_model().to_string())
    }

    /// Liveness probe path; an empty string disables the probe
    pub fn health_path(&self) -> Option<&str> {
        self.story
            .health_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.story
            .max_output_tokens
            .unwrap_or_else(|| self.story.template.default_max_output_tokens())
    }
}
