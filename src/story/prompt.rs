//! Prompt construction for the story variants
//!
//! Recipe names and story fragments are interpolated as-is.

use serde::Deserialize;

const CONTINUE_OPENING: &str =
    "Continue the user's story about the recipe name {recipe}. Craft a lengthy, convoluted story.";
const FRESH_OPENING: &str = "Craft a lengthy, convoluted story about the recipe named {recipe}.";
const STORY_BODY: &str = "Dive deep into the myriad details of how you discovered it. \
Let your imagination roam, and craft this tale as if the recipe has woven itself intricately \
into your life's rich narrative.";
const PARAGRAPHS: &str = "Break the story into paragraphs.";
const OPEN_ENDED: &str = "And remember, always leave the story open-ended, never drawing it \
to a full conclusion, as the tale should always have room to grow and expand.";

fn directive(opening: &str, paragraphs: bool, recipe_name: &str) -> String {
    let mut text = opening.replace("{recipe}", recipe_name);
    for part in [Some(STORY_BODY), paragraphs.then_some(PARAGRAPHS), Some(OPEN_ENDED)]
        .into_iter()
        .flatten()
    {
        text.push(' ');
        text.push_str(part);
    }
    text
}

/// Narrative template, one per deployed variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// System directive asking the model to continue the user's story.
    /// Without a story so far it asks for a fresh one instead.
    Continuation,
    /// System directive asking for a fresh story, user text appended as context
    Fresh,
    /// Single instruction string for the text completions endpoint
    Combined,
}

impl PromptTemplate {
    pub fn build(self, recipe_name: &str, last_sentences: &str) -> PromptSpec {
        match self {
            Self::Continuation => {
                let opening = if last_sentences.is_empty() {
                    FRESH_OPENING
                } else {
                    CONTINUE_OPENING
                };
                PromptSpec::Chat {
                    system: directive(opening, true, recipe_name),
                    user: last_sentences.to_string(),
                }
            }
            Self::Fresh => PromptSpec::Chat {
                system: directive(FRESH_OPENING, false, recipe_name),
                user: last_sentences.to_string(),
            },
            Self::Combined => {
                let mut prompt = format!("Write a story about the recipe named {recipe_name}.");
                if !last_sentences.is_empty() {
                    prompt.push(' ');
                    prompt.push_str(last_sentences);
                }
                PromptSpec::Combined(prompt)
            }
        }
    }

    pub const fn default_max_output_tokens(self) -> u32 {
        match self {
            Self::Continuation => 350,
            Self::Fresh => 200,
            Self::Combined => 150,
        }
    }

    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Continuation | Self::Fresh => "gpt-3.5-turbo",
            Self::Combined => "gpt-3.5-turbo-instruct",
        }
    }

    /// The combined variant was the one deployed behind the rate limiter
    pub const fn rate_limited_by_default(self) -> bool {
        matches!(self, Self::Combined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

/// Payload handed to the completion provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSpec {
    Chat { system: String, user: String },
    Combined(String),
}

impl PromptSpec {
    /// Role-tagged messages for chat endpoints.
    ///
    /// An empty user turn is dropped so the model starts a new story.
    pub fn messages(&self) -> Vec<(Role, &str)> {
        match self {
            Self::Chat { system, user } => {
                let mut messages = vec![(Role::System, system.as_str())];
                if !user.is_empty() {
                    messages.push((Role::User, user.as_str()));
                }
                messages
            }
            Self::Combined(prompt) => vec![(Role::User, prompt.as_str())],
        }
    }
}
