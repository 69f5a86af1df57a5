//! API request and response types

use crate::tutor::{StudentProfile, Turn, TutorRequest};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat` and `POST /api/solve`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub question: String,
    #[serde(alias = "engagementLevel")]
    pub engagement: f64,
    #[serde(alias = "pastPerformance")]
    pub performance: f64,
    #[serde(default)]
    pub history: Vec<Turn>,
    /// Per-request credential; overrides the server's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ChatRequest {
    pub fn from_tutor_request(request: TutorRequest, api_key: Option<String>) -> Self {
        Self {
            question: request.question,
            engagement: request.profile.engagement,
            performance: request.profile.performance,
            history: request.history,
            api_key,
        }
    }

    /// Split into the tutor request and the optional credential
    pub fn into_parts(self) -> (TutorRequest, Option<String>) {
        let request = TutorRequest::new(
            self.question,
            StudentProfile::new(self.engagement, self.performance),
            self.history,
        );
        (request, self.api_key)
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Model metadata for `GET /api/models`
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub description: String,
    pub context_window: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
    /// Whether the server holds its own credential
    pub configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
