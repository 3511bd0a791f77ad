//! HTTP response building module
//!
//! Every builder attaches the configured CORS headers. Builder failures are logged and
//! fall back to a bare response with the same status instead of panicking.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::CorsConfig;

fn with_cors(builder: Builder, cors: &CorsConfig) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", &cors.allow_origin)
        .header("Access-Control-Allow-Headers", &cors.allow_headers)
        .header("Access-Control-Allow-Methods", &cors.allow_methods)
}

/// Build OPTIONS response (preflight request)
pub fn build_preflight_response(cors: &CorsConfig) -> Response<Full<Bytes>> {
    with_cors(Response::builder().status(StatusCode::OK), cors)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            bare_response(StatusCode::OK, Bytes::new())
        })
}

/// Build plain-text response
pub fn build_text_response(
    status: StatusCode,
    text: &'static str,
    cors: &CorsConfig,
) -> Response<Full<Bytes>> {
    with_cors(Response::builder().status(status), cors)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(text.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            bare_response(status, Bytes::from_static(text.as_bytes()))
        })
}

/// Build JSON response with compact serialization
pub fn build_json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    cors: &CorsConfig,
) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return build_json_fallback(cors);
        }
    };

    with_cors(Response::builder().status(status), cors)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            build_json_fallback(cors)
        })
}

fn build_json_fallback(cors: &CorsConfig) -> Response<Full<Bytes>> {
    let body = Bytes::from_static(br#"{"error":"Internal server error"}"#);
    with_cors(
        Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR),
        cors,
    )
    .header("Content-Type", "application/json")
    .body(Full::new(body.clone()))
    .unwrap_or_else(|_| bare_response(StatusCode::INTERNAL_SERVER_ERROR, body))
}

/// Response without headers, used only when a builder rejected a header value
fn bare_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp
}

pub fn build_404_response(cors: &CorsConfig) -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found", cors)
}

pub fn build_413_response(cors: &CorsConfig) -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large", cors)
}

/// Build liveness probe response
pub fn build_health_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache")
        .body(Full::new(Bytes::from_static(b"ok")))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from_static(b"ok")))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
