//! Google Gemini provider implementation

use super::models::ModelDef;
use super::types::{
    LlmMessage, LlmRequest, LlmResponse, MessageRole, ResponseFormat, TextStream, Usage,
};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout;

/// Public Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Time allowed for a stream's response headers to arrive
const STREAM_OPEN_TIMEOUT: Duration = Duration::from_secs(60);
/// Maximum silence between two streamed events
const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini service implementation.
///
/// One instance holds exactly one credential and is never reconfigured.
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: &'static ModelDef,
    base_url: String,
    open_timeout: Duration,
}

impl GeminiService {
    pub fn new(
        api_key: String,
        model: &'static ModelDef,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            open_timeout: STREAM_OPEN_TIMEOUT,
        })
    }

    /// Override how long opening a stream may wait for response headers
    pub fn with_open_timeout(mut self, open_timeout: Duration) -> Self {
        self.open_timeout = open_timeout;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.base_url, self.model.api_name)
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = if request.system.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system.clone(),
                }],
            })
        };

        let contents = request.messages.iter().map(translate_message).collect();

        let (response_mime_type, response_schema) = match &request.format {
            ResponseFormat::Text => (None, None),
            ResponseFormat::Json { schema } => {
                (Some("application/json".to_string()), Some(schema.clone()))
            }
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
                response_mime_type,
                response_schema,
            },
        }
    }

    fn classify_error(status: StatusCode, body: &str) -> LlmError {
        let detail = serde_json::from_str::<GeminiErrorEnvelope>(body)
            .map(|e| e.error)
            .ok();
        let message = detail
            .as_ref()
            .map_or_else(|| body.to_string(), |d| d.message.clone());
        let key_problem = detail.as_ref().is_some_and(GeminiErrorDetail::is_key_problem);

        match status.as_u16() {
            400 if key_problem => LlmError::auth(format!("API key rejected: {message}")),
            401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
            429 => LlmError::rate_limit(format!("Rate limited: {message}")),
            400 => LlmError::invalid_request(format!("Invalid request: {message}")),
            500..=599 => LlmError::server_error(format!("Server error: {message}")),
            _ => LlmError::unknown(format!("HTTP {status}: {message}")),
        }
    }

    /// Send a request, waiting at most `open_timeout` for the headers.
    /// The body is left unbounded; streams police it with the idle timeout.
    async fn open(&self, url: &str, body: &GeminiRequest) -> Result<reqwest::Response, LlmError> {
        let send = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send();

        match timeout(self.open_timeout, send).await {
            Ok(result) => result.map_err(|e| LlmError::from_transport(&e)),
            Err(_) => Err(LlmError::network(format!(
                "Gemini did not answer within {}s",
                self.open_timeout.as_secs()
            ))),
        }
    }
}

/// The single place where tutor roles become Gemini roles
fn translate_message(msg: &LlmMessage) -> GeminiContent {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    };
    GeminiContent {
        role: Some(role.to_string()),
        parts: vec![GeminiPart {
            text: msg.text.clone(),
        }],
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = Self::translate_request(request);
        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::malformed(format!("Failed to parse response: {e}")))?;
        normalize_response(parsed)
    }

    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let body = Self::translate_request(request);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.open(&url, &body).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                LlmError::network(format!("HTTP {status}; failed to read error body: {e}"))
            })?;
            return Err(Self::classify_error(status, &text));
        }

        let events = response.bytes_stream().eventsource();
        Ok(fragment_stream(events, STREAM_IDLE_TIMEOUT))
    }

    fn model_id(&self) -> &str {
        self.model.id
    }
}

fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
    if let Some(error) = resp.error {
        return Err(LlmError::server_error(error.message));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::malformed("Response contained no candidates"))?;

    let text = candidate.text();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(LlmError::malformed(format!(
            "Response contained no text (finish reason: {reason})"
        )));
    }

    Ok(LlmResponse {
        text,
        finish_reason: candidate.finish_reason,
        usage: resp.usage_metadata.map(Usage::from).unwrap_or_default(),
    })
}

struct SseState<S> {
    events: Pin<Box<S>>,
    finished: bool,
}

/// Turn Gemini's SSE event stream into a fragment stream.
///
/// The sequence ends cleanly only after an event carrying a finish reason;
/// a connection that closes earlier, an idle timeout, or an error payload
/// ends it with an error.
fn fragment_stream<S, E>(events: S, idle: Duration) -> TextStream
where
    S: Stream<Item = Result<eventsource_stream::Event, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = Some(SseState {
        events: Box::pin(events),
        finished: false,
    });

    let fragments = stream::unfold(state, move |state| async move {
        let mut state = state?;
        loop {
            let event = match timeout(idle, state.events.next()).await {
                Err(_) => {
                    let msg = format!("No data from Gemini for {}s", idle.as_secs());
                    return Some((Err(LlmError::network(msg)), None));
                }
                Ok(None) if state.finished => return None,
                Ok(None) => {
                    let err = LlmError::network("Gemini stream closed before the answer finished");
                    return Some((Err(err), None));
                }
                Ok(Some(Err(e))) => {
                    let err = LlmError::network(format!("SSE stream error: {e}"));
                    return Some((Err(err), None));
                }
                Ok(Some(Ok(event))) => event,
            };

            tracing::trace!(data = %event.data, "Gemini SSE event");

            let chunk: GeminiResponse = match serde_json::from_str(&event.data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err = LlmError::malformed(format!("SSE parsing error: {e}"));
                    return Some((Err(err), None));
                }
            };

            if let Some(error) = chunk.error {
                return Some((Err(LlmError::server_error(error.message)), None));
            }

            let mut text = String::new();
            for candidate in &chunk.candidates {
                if candidate.finish_reason.is_some() {
                    state.finished = true;
                }
                text.push_str(&candidate.text());
            }

            if !text.is_empty() {
                return Some((Ok(text), Some(state)));
            }
        }
    });

    Box::pin(fragments)
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

impl GeminiCandidate {
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

impl From<GeminiUsage> for Usage {
    fn from(u: GeminiUsage) -> Self {
        Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<Value>,
}

impl GeminiErrorDetail {
    /// Gemini reports bad keys as 400 INVALID_ARGUMENT with reason API_KEY_INVALID
    fn is_key_problem(&self) -> bool {
        let reason_is_key = self.details.iter().any(|d| {
            d.get("reason")
                .and_then(Value::as_str)
                .is_some_and(|r| r.starts_with("API_KEY"))
        });
        reason_is_key || self.message.to_ascii_lowercase().contains("api key")
    }
}
