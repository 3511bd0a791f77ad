//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: access logging, route matching and dispatch
//! to the story handler.

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, ORIGIN, SERVER, USER_AGENT};
use hyper::{Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);
    let entry = access_log.then(|| access_entry(&req, peer_addr));

    let mut response = route_request(req, &state).await;

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method(),
        req.uri().path(),
        req.version(),
    );
    entry.origin = header(ORIGIN);
    entry.user_agent = header(USER_AGENT);
    entry
}

/// Route request based on path and configuration
async fn route_request<B>(req: Request<B>, state: &Arc<AppState>) -> Response<Full<Bytes>>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let cors = &state.config.cors;
    let path = req.uri().path();

    // Health check endpoint (highest priority, always fast)
    if state.config.health_path() == Some(path) {
        return http::build_health_response();
    }

    if path != state.config.story.path {
        logger::log_warning(&format!("No route for {} {path}", req.method()));
        return http::build_404_response(cors);
    }

    state.handler.handle(req).await
}
