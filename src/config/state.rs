// Application state module
// Wires configuration into the story handler shared by all connections

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hyper::header::HeaderValue;
use thiserror::Error;

use super::types::{Config, CorsConfig};
use crate::provider::OpenAiClient;
use crate::story::{HandlerConfig, RateLimiter, SlidingWindowLimiter, StoryHandler, SystemClock};

/// Failures that prevent the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("environment variable {0} is not set (provider API key)")]
    MissingApiKey(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("cors.{field} is not a valid header value: {value:?}")]
    InvalidCorsHeader { field: &'static str, value: String },
}

/// Reject CORS values that the response builders would refuse as header values
fn validate_cors(cors: &CorsConfig) -> Result<(), StartupError> {
    let fields = [
        ("allow_origin", &cors.allow_origin),
        ("allow_headers", &cors.allow_headers),
        ("allow_methods", &cors.allow_methods),
    ];
    for (field, value) in fields {
        if HeaderValue::from_str(value).is_err() {
            return Err(StartupError::InvalidCorsHeader {
                field,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Application state
pub struct AppState {
    pub config: Config,
    pub handler: StoryHandler,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
}

impl AppState {
    /// Build state with the OpenAI-compatible provider, reading the key from the environment
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        validate_cors(&config.cors)?;

        let key_var = &config.provider.api_key_env;
        let api_key = std::env::var(key_var)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| StartupError::MissingApiKey(key_var.clone()))?;

        let client = OpenAiClient::new(&config.provider.base_url, api_key)?;
        let handler = StoryHandler::new(handler_config(config), Arc::new(client));
        Ok(Self::new(config, handler))
    }

    pub fn new(config: &Config, handler: StoryHandler) -> Self {
        Self {
            config: config.clone(),
            handler,
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
        }
    }
}

/// Translate file/env configuration into the handler's variant settings
pub fn handler_config(config: &Config) -> HandlerConfig {
    let rate_limiter = config.rate_limit_enabled().then(|| {
        Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window_ms,
        )) as Arc<dyn RateLimiter>
    });

    HandlerConfig {
        template: config.story.template,
        model: config.model(),
        max_output_tokens: config.max_output_tokens(),
        rate_limiter,
        clock: Arc::new(SystemClock),
        cors: config.cors.clone(),
        max_body_size: config.http.max_body_size,
    }
}
