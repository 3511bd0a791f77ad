//! Story request handler
//!
//! Flow for one invocation:
//! 1. `OPTIONS` answers the preflight, any other non-`POST` method gets 405
//! 2. The optional rate limiter admits or rejects (429)
//! 3. The body is size-checked (413), collected and parsed, a missing recipe name gets 400
//! 4. The prompt is built and sent to the provider, the only suspension point
//! 5. Provider text becomes 200 `{"story":..}`, provider failure 500 `{"error":..}`

use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;

use super::completion::{CompletionClient, CompletionError, CompletionRequest};
use super::prompt::PromptTemplate;
use super::rate_limit::{Clock, RateLimiter};
use super::request::StoryRequest;
use crate::config::CorsConfig;
use crate::http;
use crate::logger;

pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
pub const RECIPE_NAME_REQUIRED: &str = "Recipe name is required";
pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

/// Per-deployment settings; variants differ only here
pub struct HandlerConfig {
    pub template: PromptTemplate,
    pub model: String,
    pub max_output_tokens: u32,
    /// `None` disables rate limiting
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub clock: Arc<dyn Clock>,
    pub cors: CorsConfig,
    pub max_body_size: u64,
}

/// Terminal state of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    PreflightOk,
    MethodNotAllowed,
    RateLimited,
    PayloadTooLarge,
    BadRequest,
    Success(String),
    ProviderError(CompletionError),
}

#[derive(Serialize)]
struct StoryBody<'a> {
    story: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

pub struct StoryHandler {
    config: HandlerConfig,
    client: Arc<dyn CompletionClient>,
}

impl StoryHandler {
    pub fn new(config: HandlerConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self { config, client }
    }

    /// Run the full invocation and shape the HTTP response
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let outcome = self.process(req).await;
        self.respond(&outcome)
    }

    pub async fn process<B>(&self, req: Request<B>) -> Outcome
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        logger::log_story_request(&parts.method);

        match parts.method {
            Method::OPTIONS => return Outcome::PreflightOk,
            Method::POST => {}
            _ => return Outcome::MethodNotAllowed,
        }

        if let Some(limiter) = &self.config.rate_limiter {
            if !limiter.admit(self.config.clock.now_millis()) {
                logger::log_rate_limited();
                return Outcome::RateLimited;
            }
        }

        // Checked after admission so declared and chunked oversize bodies both hold a slot
        if declared_length_exceeds(&parts.headers, self.config.max_body_size) {
            return Outcome::PayloadTooLarge;
        }

        let bytes = match read_body(body, self.config.max_body_size).await {
            Ok(bytes) => bytes,
            Err(outcome) => return outcome,
        };

        let request = match StoryRequest::parse(&bytes) {
            Ok(request) => request,
            Err(e) => {
                logger::log_warning(&format!("Rejected story request: {e}"));
                return Outcome::BadRequest;
            }
        };

        let prompt = self
            .config
            .template
            .build(&request.recipe_name, &request.last_sentences);

        let result = self
            .client
            .complete(CompletionRequest {
                model: &self.config.model,
                prompt: &prompt,
                max_output_tokens: self.config.max_output_tokens,
            })
            .await;

        match result {
            Ok(story) => {
                logger::log_story_generated(&request.recipe_name, story.len());
                Outcome::Success(story)
            }
            Err(e) => {
                logger::log_provider_error(&e);
                Outcome::ProviderError(e)
            }
        }
    }

    pub fn respond(&self, outcome: &Outcome) -> Response<Full<Bytes>> {
        let cors = &self.config.cors;
        match outcome {
            Outcome::PreflightOk => http::build_preflight_response(cors),
            Outcome::MethodNotAllowed => {
                http::build_text_response(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED, cors)
            }
            Outcome::RateLimited => http::build_json_response(
                StatusCode::TOO_MANY_REQUESTS,
                &ErrorBody {
                    error: RATE_LIMIT_EXCEEDED,
                },
                cors,
            ),
            Outcome::PayloadTooLarge => http::build_413_response(cors),
            Outcome::BadRequest => {
                http::build_text_response(StatusCode::BAD_REQUEST, RECIPE_NAME_REQUIRED, cors)
            }
            Outcome::Success(story) => {
                http::build_json_response(StatusCode::OK, &StoryBody { story }, cors)
            }
            Outcome::ProviderError(e) => http::build_json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorBody {
                    error: &e.to_string(),
                },
                cors,
            ),
        }
    }
}

/// Validate the Content-Length header against the cap
fn declared_length_exceeds(headers: &HeaderMap, max_body_size: u64) -> bool {
    let Some(content_length) = headers.get(CONTENT_LENGTH) else {
        return false;
    };
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return false;
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            true
        }
        Ok(_) => false,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            false
        }
    }
}

/// Collect the body, enforcing the size cap while reading
async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, Outcome>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeds {max_body_size} bytes"));
            Err(Outcome::PayloadTooLarge)
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(Outcome::BadRequest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{PromptSpec, SlidingWindowLimiter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubClient {
        result: Result<String, CompletionError>,
        calls: AtomicUsize,
        last: Mutex<Option<(String, PromptSpec, u32)>>,
    }

    impl StubClient {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Err(CompletionError::Api {
                    status: 429,
                    message: message.to_string(),
                }),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(
            &self,
            request: CompletionRequest<'_>,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((
                request.model.to_string(),
                request.prompt.clone(),
                request.max_output_tokens,
            ));
            self.result.clone()
        }
    }

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn advance(&self, ms: i64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn cors() -> CorsConfig {
        CorsConfig {
            allow_origin: "https://bkgoksel.github.io".to_string(),
            allow_headers: "Content-Type".to_string(),
            allow_methods: "POST, OPTIONS".to_string(),
        }
    }

    fn config(rate_limiter: Option<Arc<dyn RateLimiter>>, clock: Arc<dyn Clock>) -> HandlerConfig {
        HandlerConfig {
            template: PromptTemplate::Continuation,
            model: "gpt-3.5-turbo".to_string(),
            max_output_tokens: 350,
            rate_limiter,
            clock,
            cors: cors(),
            max_body_size: 1024,
        }
    }

    fn handler(client: Arc<StubClient>) -> StoryHandler {
        StoryHandler::new(config(None, Arc::new(ManualClock(AtomicI64::new(0)))), client)
    }

    fn limited_handler(client: Arc<StubClient>, limit: usize) -> (StoryHandler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(AtomicI64::new(1_700_000_000_000)));
        let limiter: Arc<dyn RateLimiter> = Arc::new(SlidingWindowLimiter::new(limit, 60_000));
        let handler = StoryHandler::new(config(Some(limiter), clock.clone()), client);
        (handler, clock)
    }

    fn request(method: Method, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri("/generate_story")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    fn pancakes() -> Request<Full<Bytes>> {
        request(Method::POST, r#"{"recipe_name": "Pancakes"}"#)
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_cors(resp: &Response<Full<Bytes>>) {
        let h = resp.headers();
        assert_eq!(h["Access-Control-Allow-Origin"], "https://bkgoksel.github.io");
        assert_eq!(h["Access-Control-Allow-Headers"], "Content-Type");
        assert_eq!(h["Access-Control-Allow-Methods"], "POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let client = StubClient::ok("unused");
        let resp = handler(client.clone()).handle(request(Method::OPTIONS, "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(body_string(resp).await, "");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_is_rejected() {
        let client = StubClient::ok("unused");
        let resp = handler(client.clone())
            .handle(request(Method::GET, r#"{"recipe_name":"Pancakes"}"#))
            .await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(&resp);
        assert_eq!(body_string(resp).await, "Method Not Allowed");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_recipe_name() {
        let client = StubClient::ok("unused");
        let h = handler(client.clone());

        let resp = h.handle(request(Method::POST, "{}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_cors(&resp);
        assert_eq!(body_string(resp).await, "Recipe name is required");

        let resp = h.handle(request(Method::POST, "not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "Recipe name is required");

        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_story_success() {
        let client = StubClient::ok("Once upon a time...");
        let resp = handler(client.clone()).handle(pancakes()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(resp.headers()["Content-Type"], "application/json");
        assert_eq!(body_string(resp).await, r#"{"story":"Once upon a time..."}"#);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_is_forwarded() {
        let client = StubClient::failing("quota exceeded");
        let resp = handler(client.clone()).handle(pancakes()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&resp);
        assert_eq!(body_string(resp).await, r#"{"error":"quota exceeded"}"#);
    }

    #[tokio::test]
    async fn test_prompt_and_limits_reach_provider() {
        let client = StubClient::ok("...");
        let h = handler(client.clone());
        h.handle(request(
            Method::POST,
            r#"{"recipe_name":"Pancakes","last_sentences":"The griddle hissed."}"#,
        ))
        .await;

        let (model, prompt, max_tokens) = client.last.lock().unwrap().clone().unwrap();
        assert_eq!(model, "gpt-3.5-turbo");
        assert_eq!(max_tokens, 350);
        assert_eq!(prompt, PromptTemplate::Continuation.build("Pancakes", "The griddle hissed."));
    }

    #[tokio::test]
    async fn test_identical_requests_identical_bodies() {
        let client = StubClient::ok("Once upon a time...");
        let h = handler(client);
        let first = body_string(h.handle(pancakes()).await).await;
        let second = body_string(h.handle(pancakes()).await).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rate_limit_eleventh_request() {
        let client = StubClient::ok("story");
        let (h, clock) = limited_handler(client.clone(), 10);

        for _ in 0..10 {
            let resp = h.handle(pancakes()).await;
            assert_eq!(resp.status(), StatusCode::OK);
            clock.advance(1_000);
        }

        let resp = h.handle(pancakes()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_cors(&resp);
        assert_eq!(body_string(resp).await, r#"{"error":"Rate limit exceeded"}"#);
        assert_eq!(client.calls(), 10);

        // first admission was at t0, now is t0 + 10s; push it past 60s
        clock.advance(50_001);
        let resp = h.handle(pancakes()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(client.calls(), 11);
    }

    #[tokio::test]
    async fn test_provider_error_keeps_slot_consumed() {
        let client = StubClient::failing("boom");
        let (h, _clock) = limited_handler(client.clone(), 1);

        let resp = h.handle(pancakes()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = h.handle(pancakes()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_preflight_and_method_check_skip_rate_limit() {
        let client = StubClient::ok("story");
        let (h, _clock) = limited_handler(client, 0);

        assert_eq!(h.process(request(Method::OPTIONS, "")).await, Outcome::PreflightOk);
        assert_eq!(h.process(request(Method::GET, "")).await, Outcome::MethodNotAllowed);
        assert_eq!(h.process(pancakes()).await, Outcome::RateLimited);
    }

    #[tokio::test]
    async fn test_non_object_bodies_are_rejected() {
        let client = StubClient::ok("unused");
        let h = handler(client.clone());
        for body in [r#"["Pancakes"]"#, "null", r#""Pancakes""#] {
            let resp = h.handle(request(Method::POST, body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
            assert_cors(&resp);
            assert_eq!(body_string(resp).await, "Recipe name is required");
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_story_prompt_starts_fresh() {
        let client = StubClient::ok("...");
        handler(client.clone()).handle(pancakes()).await;

        let (_, prompt, _) = client.last.lock().unwrap().clone().unwrap();
        let PromptSpec::Chat { system, user } = prompt else {
            panic!("expected chat prompt");
        };
        assert!(system.starts_with("Craft a lengthy"));
        assert!(!system.contains("Continue"));
        assert_eq!(user, "");
    }

    #[tokio::test]
    async fn test_oversized_body_holds_slot_either_way() {
        let client = StubClient::ok("story");
        let big = format!(r#"{{"recipe_name":"Pancakes","last_sentences":"{}"}}"#, "a".repeat(2048));

        // declared through Content-Length
        let (h, _clock) = limited_handler(client.clone(), 1);
        let mut req = request(Method::POST, &big);
        req.headers_mut()
            .insert(CONTENT_LENGTH, big.len().to_string().parse().unwrap());
        assert_eq!(h.process(req).await, Outcome::PayloadTooLarge);
        assert_eq!(h.process(pancakes()).await, Outcome::RateLimited);

        // discovered while reading
        let (h, _clock) = limited_handler(client.clone(), 1);
        assert_eq!(h.process(request(Method::POST, &big)).await, Outcome::PayloadTooLarge);
        assert_eq!(h.process(pancakes()).await, Outcome::RateLimited);

        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let client = StubClient::ok("story");
        let h = handler(client.clone());
        let big = format!(r#"{{"recipe_name":"Pancakes","last_sentences":"{}"}}"#, "a".repeat(2048));
        let resp = h.handle(request(Method::POST, &big)).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_cors(&resp);
        assert_eq!(client.calls(), 0);
    }
}
