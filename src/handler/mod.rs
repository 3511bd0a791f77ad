//! Request handler module
//!
//! Routes inbound requests to the story endpoint or the liveness probe.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
