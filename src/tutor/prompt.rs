//! Tutor instruction building
//!
//! Turns a [`TutorRequest`] into an [`LlmRequest`]: the system instruction
//! carries the persona, the student profile and the shaping rules for the
//! turn; the history becomes the message list; the question is the final
//! user message.

use super::shaping::{QuestionType, TurnKind};
use super::{DeliveryMode, TutorRequest};
use crate::llm::{LlmMessage, LlmRequest, ResponseFormat};
use serde_json::{json, Value};
use std::fmt::Write;

const PERSONA: &str = "You are GyanMitra, an expert AI tutor. Give students clear, direct and engaging help.";

const FORMATTING_RULE: &str = "Format all answer text as Markdown. Put code, math equations and shell commands in fenced code blocks. Present steps as numbered lists.";

const NO_FILLER_RULE: &str = "Answer the question directly and accurately. No greetings, filler or introductory phrases.";

/// Fewest / most words asked for in an explanation
const MIN_EXPLANATION_WORDS: f64 = 80.0;
const MAX_EXPLANATION_WORDS: f64 = 360.0;

/// Tone bands used to describe the depth target to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Register {
    Foundational,
    Balanced,
    Advanced,
}

impl Register {
    fn guidance(self) -> &'static str {
        match self {
            Register::Foundational => {
                "Build from the foundations: define every term, show every intermediate step and use a simple analogy where it helps."
            }
            Register::Balanced => {
                "Explain each step briefly and name the key concept behind it."
            }
            Register::Advanced => {
                "Be succinct and advanced: skip the basics and focus on the key concepts and any subtle points."
            }
        }
    }
}

/// How much explaining the student profile calls for.
///
/// Depth is a continuous function of the profile: lower engagement or
/// performance never yields a shorter target than higher values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplanationDepth {
    /// Mean of engagement and performance, in `[0, 1]`
    pub readiness: f64,
    /// Suggested explanation length in words
    pub target_words: u32,
    pub register: Register,
}

impl ExplanationDepth {
    pub fn for_profile(engagement: f64, performance: f64) -> Self {
        let readiness = ((engagement + performance) / 2.0).clamp(0.0, 1.0);
        let words = MAX_EXPLANATION_WORDS - (MAX_EXPLANATION_WORDS - MIN_EXPLANATION_WORDS) * readiness;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounded above
        let target_words = words.round() as u32;

        let register = if readiness < 0.4 {
            Register::Foundational
        } else if readiness < 0.7 {
            Register::Balanced
        } else {
            Register::Advanced
        };

        Self {
            readiness,
            target_words,
            register,
        }
    }
}

/// Knobs the responder passes through to every generation request
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: Some(2048),
            temperature: None,
        }
    }
}

/// Build the generation request for one tutor turn
pub fn build_request(
    request: &TutorRequest,
    mode: DeliveryMode,
    settings: GenerationSettings,
) -> LlmRequest {
    let kind = TurnKind::of(request.history.len());

    let mut messages: Vec<LlmMessage> = request
        .history
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(super::Turn::to_message)
        .collect();
    messages.push(LlmMessage::user(request.question.trim()));

    let format = match mode {
        DeliveryMode::Single => ResponseFormat::Json {
            schema: answer_schema(kind),
        },
        DeliveryMode::Stream => ResponseFormat::Text,
    };

    LlmRequest {
        system: system_instruction(request, kind, mode),
        messages,
        format,
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    }
}

/// JSON schema the model's structured answer must follow
pub fn answer_schema(kind: TurnKind) -> Value {
    match kind {
        TurnKind::First => json!({
            "type": "OBJECT",
            "properties": {
                "questionType": {
                    "type": "STRING",
                    "enum": [QuestionType::Factual.label(), QuestionType::ProblemSolving.label()],
                    "description": "Whether the question asks for a fact or for a problem to be solved."
                },
                "solution": {
                    "type": "STRING",
                    "description": "Direct, accurate answer in Markdown."
                },
                "difficulty": {
                    "type": "STRING",
                    "description": "Complexity of the solution: Beginner, Intermediate or Advanced."
                },
                "explanation": {
                    "type": "STRING",
                    "description": "Step-by-step explanation in Markdown. Only for problem-solving questions."
                }
            },
            "required": ["questionType", "solution", "difficulty"],
            "propertyOrdering": ["questionType", "solution", "difficulty", "explanation"]
        }),
        TurnKind::FollowUp => json!({
            "type": "OBJECT",
            "properties": {
                "questionType": {
                    "type": "STRING",
                    "enum": [QuestionType::FollowUp.label()]
                },
                "solution": {
                    "type": "STRING",
                    "description": "Conversational, concise answer in Markdown."
                }
            },
            "required": ["questionType", "solution"],
            "propertyOrdering": ["questionType", "solution"]
        }),
    }
}

fn system_instruction(request: &TutorRequest, kind: TurnKind, mode: DeliveryMode) -> String {
    let profile = request.profile;
    let depth = ExplanationDepth::for_profile(profile.engagement, profile.performance);

    let mut out = String::new();
    let _ = writeln!(out, "{PERSONA}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Student profile:");
    let _ = writeln!(
        out,
        "- Engagement level: {:.2} (0 = low, 1 = high)",
        profile.engagement
    );
    let _ = writeln!(
        out,
        "- Past performance: {:.2} (0 = poor, 1 = excellent)",
        profile.performance
    );
    let _ = writeln!(
        out,
        "Explanation depth: {} Aim for about {} words of explanation.",
        depth.register.guidance(),
        depth.target_words
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Rules:");

    let rules: Vec<&str> = match (kind, mode) {
        (TurnKind::First, DeliveryMode::Single) => vec![
            "Decide whether the question is factual (e.g. \"What is photosynthesis?\") or problem-solving (e.g. \"Solve for x in 2x+5=15\") and report it as questionType.",
            NO_FILLER_RULE,
            "Rate the complexity of your solution as difficulty (Beginner, Intermediate or Advanced).",
            "For problem-solving questions, give a step-by-step explanation of how the solution is reached, at the explanation depth above. For factual questions, leave explanation out entirely.",
            FORMATTING_RULE,
            "Reply with a single JSON object that matches the response schema.",
        ],
        (TurnKind::FollowUp, DeliveryMode::Single) => vec![
            "This is a follow-up question in an ongoing conversation; set questionType to \"follow-up\".",
            "Answer conversationally and concisely in the context of the earlier turns. Do not repeat a solution you already gave.",
            "Do not include difficulty or explanation fields.",
            FORMATTING_RULE,
            "Reply with a single JSON object that matches the response schema.",
        ],
        (TurnKind::First, DeliveryMode::Stream) => vec![
            "First decide whether the question is factual or problem-solving.",
            NO_FILLER_RULE,
            "For a problem-solving question, work through the solution step by step at the explanation depth above. For a factual question, give the answer without a separate explanation section.",
            FORMATTING_RULE,
            "Your response must be only the Markdown text of the answer. Do not wrap it in JSON.",
        ],
        (TurnKind::FollowUp, DeliveryMode::Stream) => vec![
            "This is a follow-up question in an ongoing conversation.",
            "Answer conversationally and concisely in the context of the earlier turns. Do not repeat a solution you already gave and do not add a separate explanation section.",
            FORMATTING_RULE,
            "Your response must be only the Markdown text of the answer. Do not wrap it in JSON.",
        ],
    };

    for (i, rule) in rules.iter().enumerate() {
        let _ = writeln!(out, "{}. {rule}", i + 1);
    }

    out
}
