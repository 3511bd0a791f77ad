//! HTTP protocol layer module
//!
//! Response builders shared by the story handler and the router.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_413_response, build_health_response, build_json_response,
    build_preflight_response, build_text_response,
};
