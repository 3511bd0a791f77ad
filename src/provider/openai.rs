use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::story::{CompletionClient, CompletionError, CompletionRequest, PromptSpec};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: MessageResponse,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TextCompletion {
    choices: Vec<TextChoice>,
}

#[derive(Deserialize)]
struct TextChoice {
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for OpenAI-compatible chat and text completion endpoints
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: reqwest::Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<T: Serialize + Sync, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<R, CompletionError> {
        let response = self
            .http_client
            .post(format!("{}/{endpoint}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<R>()
                .await
                .map_err(|e| CompletionError::MalformedResponse(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(api_error(status, &body))
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, CompletionError> {
        match request.prompt {
            PromptSpec::Chat { .. } => {
                let messages = request
                    .prompt
                    .messages()
                    .into_iter()
                    .map(|(role, content)| Message {
                        role: role.as_str(),
                        content,
                    })
                    .collect();
                let completion: ChatCompletion = self
                    .post(
                        "chat/completions",
                        &ChatRequest {
                            model: request.model,
                            messages,
                            max_tokens: request.max_output_tokens,
                        },
                    )
                    .await?;
                chat_text(completion)
            }
            PromptSpec::Combined(prompt) => {
                let completion: TextCompletion = self
                    .post(
                        "completions",
                        &TextRequest {
                            model: request.model,
                            prompt,
                            max_tokens: request.max_output_tokens,
                        },
                    )
                    .await?;
                completion_text(completion)
            }
        }
    }
}

fn chat_text(completion: ChatCompletion) -> Result<String, CompletionError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            CompletionError::MalformedResponse("completion contained no message content".into())
        })
}

fn completion_text(completion: TextCompletion) -> Result<String, CompletionError> {
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.text)
        .ok_or_else(|| CompletionError::MalformedResponse("completion contained no choices".into()))
}

/// Prefer the provider's own error message, fall back to the status reason
fn api_error(status: StatusCode, body: &str) -> CompletionError {
    let message = serde_json::from_str::<ErrorResponse>(body).map_or_else(
        |_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected provider response")
                .to_string()
        },
        |response| response.error.message,
    );
    CompletionError::Api {
        status: status.as_u16(),
        message,
    }
}
