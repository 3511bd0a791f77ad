//! Inbound story request parsing

use serde_json::{Map, Value};
use thiserror::Error;

/// Why a request body was rejected
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("recipe_name is missing or empty")]
    MissingRecipeName,
}

/// A validated story request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRequest {
    pub recipe_name: String,
    /// Story so far, empty when starting a new one
    pub last_sentences: String,
}

impl StoryRequest {
    /// Parse a JSON body. An empty body is treated as `{}`.
    pub fn parse(body: &[u8]) -> Result<Self, BodyError> {
        let body = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}".as_slice()
        } else {
            body
        };

        // Arrays, strings and null carry no named fields
        let Value::Object(mut fields) = serde_json::from_slice::<Value>(body)? else {
            return Err(BodyError::MissingRecipeName);
        };

        let recipe_name = string_field(&mut fields, "recipe_name")?
            .filter(|name| !name.is_empty())
            .ok_or(BodyError::MissingRecipeName)?;

        Ok(Self {
            recipe_name,
            last_sentences: string_field(&mut fields, "last_sentences")?.unwrap_or_default(),
        })
    }
}

/// Absent and `null` fields both read as `None`; other non-strings are rejected
fn string_field(fields: &mut Map<String, Value>, key: &str) -> Result<Option<String>, BodyError> {
    match fields.remove(key) {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(None),
    }
}
