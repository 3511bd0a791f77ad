//! Story generation module
//!
//! Request parsing, prompt templates, the rate limiter and the handler that ties them
//! to a completion provider.

pub mod completion;
pub mod handler;
pub mod prompt;
pub mod rate_limit;
pub mod request;

pub use completion::{CompletionClient, CompletionError, CompletionRequest};
pub use handler::{HandlerConfig, StoryHandler};
pub use prompt::{PromptSpec, PromptTemplate, Role};
pub use rate_limit::{RateLimiter, SlidingWindowLimiter, SystemClock};
