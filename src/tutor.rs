//! Tutor response pipeline
//!
//! A [`TutorRequest`] (question, student profile, prior turns) goes in; a
//! [`TutorAnswer`] or a stream of Markdown fragments comes out.

mod error;
pub mod prompt;
#[cfg(test)]
mod proptests;
mod responder;
pub mod shaping;
mod types;

pub use error::TutorError;
pub use prompt::GenerationSettings;
pub use responder::{FragmentRelay, TutorResponder};
pub use types::{
    validate_question, Role, StudentProfile, Turn, TutorAnswer, TutorRequest, MAX_QUESTION_CHARS,
};

use std::fmt;
use std::str::FromStr;

/// How an answer is delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Markdown text relayed fragment by fragment as it is generated
    #[default]
    Stream,
    /// One structured answer, returned only once complete
    Single,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::Stream => "stream",
            DeliveryMode::Single => "single",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "streaming" => Ok(DeliveryMode::Stream),
            "single" | "single-shot" | "json" => Ok(DeliveryMode::Single),
            other => Err(format!("unknown delivery mode `{other}` (expected stream or single)")),
        }
    }
}
