//! Tutor pipeline error taxonomy

use crate::llm::{LlmError, LlmErrorKind};
use thiserror::Error;

/// Errors surfaced by the tutor pipeline
#[derive(Debug, Clone, Error)]
pub enum TutorError {
    /// Bad input shape or range; never reaches the generation capability
    #[error("{0}")]
    Validation(String),
    /// Missing or rejected credential
    #[error("{0}")]
    Auth(String),
    /// The generation capability failed or returned unusable output
    #[error("Upstream generation failed: {0}")]
    Upstream(String),
    /// A stream broke after partial delivery
    #[error("Stream interrupted: {0}")]
    Transport(String),
}

impl From<LlmError> for TutorError {
    fn from(err: LlmError) -> Self {
        match err.kind {
            LlmErrorKind::Auth => TutorError::Auth(err.message),
            _ => TutorError::Upstream(err.message),
        }
    }
}
