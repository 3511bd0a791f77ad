//! Logger module
//!
//! Provides logging utilities for the story server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Story, rate-limit and provider events
//! - File-based logging support
//!
//! Provider credentials are never passed to these helpers.

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use crate::story::CompletionError;
use hyper::Method;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.logging.level),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info log
fn write_info(level: Level, message: &str) {
    match writer::get() {
        Some(w) => w.write_info(level, message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(level: Level, message: &str) {
    match writer::get() {
        Some(w) => w.write_error(level, message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info(Level::Info, "======================================");
    write_info(Level::Info, "Recipe story server started");
    write_info(
        Level::Info,
        &format!("Listening on: http://{addr}{}", config.story.path),
    );
    write_info(
        Level::Info,
        &format!(
            "Template: {:?}, model: {}, max tokens: {}",
            config.story.template,
            config.model(),
            config.max_output_tokens()
        ),
    );
    if config.rate_limit_enabled() {
        write_info(
            Level::Info,
            &format!(
                "Rate limit: {} requests per {} ms",
                config.rate_limit.max_requests, config.rate_limit.window_ms
            ),
        );
    } else {
        write_info(Level::Info, "Rate limit: disabled");
    }
    write_info(
        Level::Info,
        &format!("CORS origin: {}", config.cors.allow_origin),
    );
    write_info(Level::Info, &format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(Level::Info, &format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(Level::Info, &format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(Level::Info, &format!("Error log: {path}"));
    }
    write_info(Level::Info, "======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(
        Level::Debug,
        &format!("[Connection] Accepted from: {peer_addr}"),
    );
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(
        Level::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_error(message: &str) {
    write_error(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, &format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_story_request(method: &Method) {
    write_info(Level::Info, &format!("[Story] Got new {method} request"));
}

pub fn log_rate_limited() {
    write_error(
        Level::Warn,
        "[RateLimit] Request rejected: rate limit exceeded",
    );
}

pub fn log_story_generated(recipe_name: &str, length: usize) {
    write_info(
        Level::Info,
        &format!("[Story] Generated {length} bytes for recipe '{recipe_name}'"),
    );
}

pub fn log_provider_error(err: &CompletionError) {
    write_error(
        Level::Error,
        &format!("[ERROR] Completion request failed ({}): {err}", err.kind()),
    );
}

pub fn log_shutdown(reason: &str) {
    write_info(Level::Info, &format!("[SHUTDOWN] {reason}"));
}
