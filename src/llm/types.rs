//! Common types for generation requests

use super::LlmError;
use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;

/// A lazy, finite, non-restartable sequence of text fragments.
///
/// Concatenating the `Ok` items in order yields the full answer. An `Err`
/// item ends the sequence.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Generation request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<LlmMessage>,
    pub format: ResponseFormat,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Shape of the output the capability should produce
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free-form (markdown) text
    Text,
    /// A JSON object matching the given schema
    Json { schema: Value },
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role as seen by the tutor; providers map these to their own labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// Single-shot generation result
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
