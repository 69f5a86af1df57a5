//! HTTP tutor client
//!
//! Drives a [`ConversationManager`] against a running server: submits the
//! question, then feeds the response into the open placeholder. Streamed
//! bodies are decoded incrementally; a body that breaks off before its end
//! is treated as a failed answer.

use crate::api::{ChatRequest, ErrorResponse};
use crate::conversation::ConversationManager;
use crate::tutor::{StudentProfile, TutorAnswer, TutorError};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How one `ask` ended
#[derive(Debug)]
pub enum AskOutcome {
    /// Another answer was still in flight; nothing was sent
    Skipped,
    Completed,
    /// The turn now shows the fallback message (after any partial text)
    Failed(TutorError),
}

pub struct TutorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TutorClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, TutorError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TutorError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Ask one question.
    ///
    /// `on_text` sees every streamed fragment as soon as it is applied to the
    /// conversation. Input errors return `Err` and leave the conversation
    /// untouched; every later failure is recorded in the conversation and
    /// reported as [`AskOutcome::Failed`].
    pub async fn ask<F>(
        &self,
        conversation: &mut ConversationManager,
        question: &str,
        profile: StudentProfile,
        on_text: F,
    ) -> Result<AskOutcome, TutorError>
    where
        F: FnMut(&str),
    {
        let Some(request) = conversation.submit(question, profile)? else {
            return Ok(AskOutcome::Skipped);
        };
        let body = ChatRequest::from_tutor_request(request, self.api_key.clone());

        match self.exchange(conversation, &body, on_text).await {
            Ok(()) => match conversation.last() {
                Some(turn) if turn.is_failed() => Ok(AskOutcome::Failed(TutorError::Upstream(
                    "Empty response".to_string(),
                ))),
                _ => Ok(AskOutcome::Completed),
            },
            Err(e) => {
                conversation.on_error(&e.to_string());
                Ok(AskOutcome::Failed(e))
            }
        }
    }

    async fn exchange<F>(
        &self,
        conversation: &mut ConversationManager,
        body: &ChatRequest,
        mut on_text: F,
    ) -> Result<(), TutorError>
    where
        F: FnMut(&str),
    {
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| TutorError::Transport(format!("Request failed: {e}")))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            return Err(error_from_response(status, &content_type, response).await);
        }

        if content_type.starts_with("application/json") {
            let answer: TutorAnswer = response
                .json()
                .await
                .map_err(|e| TutorError::Upstream(format!("Malformed answer: {e}")))?;
            conversation.on_complete(Some(answer));
            return Ok(());
        }

        let mut decoder = Utf8Decoder::default();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| TutorError::Transport(format!("Stream broken: {e}")))?;
            let text = decoder.push(&chunk);
            if !text.is_empty() && conversation.on_fragment(&text) {
                on_text(&text);
            }
        }
        let tail = decoder.finish();
        if !tail.is_empty() && conversation.on_fragment(&tail) {
            on_text(&tail);
        }

        conversation.on_complete(None);
        Ok(())
    }
}

async fn error_from_response(
    status: StatusCode,
    content_type: &str,
    response: reqwest::Response,
) -> TutorError {
    let text = response.text().await.unwrap_or_default();
    let message = if content_type.starts_with("application/json") {
        serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text)
    } else {
        text
    };

    match status {
        StatusCode::BAD_REQUEST if content_type.starts_with("text/plain") => {
            TutorError::Auth(message)
        }
        s if s.is_client_error() => TutorError::Validation(message),
        _ => TutorError::Upstream(message),
    }
}

/// Decodes UTF-8 split at arbitrary chunk boundaries.
///
/// Bytes of a character cut by a boundary are held back until the rest
/// arrives; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is still held back
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
