//! Conversation and answer types shared by the server and the client

use super::TutorError;
use crate::llm::{LlmMessage, MessageRole};
use serde::{Deserialize, Serialize};

/// Longest accepted question, in characters
pub const MAX_QUESTION_CHARS: usize = 500;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// One entry of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Set by the client when the response to this turn failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            explanation: None,
            difficulty: None,
            error: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(content)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Text a chat view shows for this turn: the content, followed by the
    /// failure notice when the response broke after partial output
    pub fn display(&self) -> String {
        match &self.error {
            Some(error) if !self.content.is_empty() && self.content != *error => {
                format!("{}\n\n{error}", self.content)
            }
            _ => self.content.clone(),
        }
    }

    pub(crate) fn to_message(&self) -> LlmMessage {
        LlmMessage {
            role: self.role.into(),
            text: self.content.clone(),
        }
    }
}

/// Signals that bias how deep the explanation goes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// 0 = not engaged, 1 = fully engaged
    pub engagement: f64,
    /// 0 = poor, 1 = excellent
    pub performance: f64,
}

impl StudentProfile {
    pub fn new(engagement: f64, performance: f64) -> Self {
        Self {
            engagement,
            performance,
        }
    }

    pub fn validate(&self) -> Result<(), TutorError> {
        for (name, value) in [
            ("engagement", self.engagement),
            ("performance", self.performance),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TutorError::Validation(format!(
                    "{name} must be a number between 0 and 1, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for StudentProfile {
    fn default() -> Self {
        Self::new(0.75, 0.6)
    }
}

/// Check the question constraint: non-blank and at most 500 characters,
/// both measured on the trimmed text that is actually sent
pub fn validate_question(question: &str) -> Result<(), TutorError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(TutorError::Validation("Please enter a question.".to_string()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(TutorError::Validation(format!(
            "Question must not exceed {MAX_QUESTION_CHARS} characters."
        )));
    }
    Ok(())
}

/// Everything needed to answer one turn.
///
/// `history` holds the turns before `question`; the question itself is not
/// part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct TutorRequest {
    pub question: String,
    pub profile: StudentProfile,
    pub history: Vec<Turn>,
}

impl TutorRequest {
    pub fn new(question: impl Into<String>, profile: StudentProfile, history: Vec<Turn>) -> Self {
        Self {
            question: question.into(),
            profile,
            history,
        }
    }

    pub fn validate(&self) -> Result<(), TutorError> {
        validate_question(&self.question)?;
        self.profile.validate()
    }

    pub fn is_first_turn(&self) -> bool {
        self.history.is_empty()
    }
}

/// Structured (single-shot) tutor answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorAnswer {
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}
