//! Turn classification and response shaping
//!
//! The model picks the question type, but which fields an answer may carry
//! is fixed here and enforced on every structured answer:
//!
//! | turn      | question type   | difficulty | explanation |
//! |-----------|-----------------|------------|-------------|
//! | first     | factual         | required   | omitted     |
//! | first     | problem-solving | required   | required    |
//! | follow-up | (forced)        | omitted    | omitted     |

use super::{TutorAnswer, TutorError};
use serde::{Deserialize, Serialize};

/// Position of the turn in its conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    First,
    FollowUp,
}

impl TurnKind {
    pub fn of(history_len: usize) -> Self {
        if history_len == 0 {
            TurnKind::First
        } else {
            TurnKind::FollowUp
        }
    }
}

/// Semantic class of a question, as labelled by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    Factual,
    #[serde(alias = "problem_solving", alias = "problemSolving")]
    ProblemSolving,
    #[serde(alias = "follow_up", alias = "followUp")]
    FollowUp,
}

impl QuestionType {
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::Factual => "factual",
            QuestionType::ProblemSolving => "problem-solving",
            QuestionType::FollowUp => "follow-up",
        }
    }
}

/// Answer object as produced by the model, before any rule is applied
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnswer {
    #[serde(default)]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub solution: String,
    #[serde(default, alias = "difficultyLevel")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl RawAnswer {
    /// Parse the model's JSON text. Tolerates a fenced ```json block.
    pub fn parse(text: &str) -> Result<Self, TutorError> {
        let body = strip_code_fence(text);
        serde_json::from_str(body)
            .map_err(|e| TutorError::Upstream(format!("Model returned malformed JSON: {e}")))
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The question type that actually governs the answer.
///
/// Follow-ups are always follow-ups. On a first turn a missing label is
/// inferred from whether an explanation was produced, and a stray
/// `follow-up` label is read as factual.
pub fn effective_question_type(kind: TurnKind, raw: &RawAnswer) -> QuestionType {
    match (kind, raw.question_type) {
        (TurnKind::FollowUp, _) => QuestionType::FollowUp,
        (TurnKind::First, Some(QuestionType::ProblemSolving)) => QuestionType::ProblemSolving,
        (TurnKind::First, Some(QuestionType::Factual | QuestionType::FollowUp)) => {
            QuestionType::Factual
        }
        (TurnKind::First, None) => {
            if raw.explanation.as_deref().is_some_and(|e| !e.trim().is_empty()) {
                QuestionType::ProblemSolving
            } else {
                QuestionType::Factual
            }
        }
    }
}

/// Apply the field rules to a raw answer
pub fn shape(kind: TurnKind, raw: RawAnswer) -> Result<TutorAnswer, TutorError> {
    let question_type = effective_question_type(kind, &raw);

    let solution = raw.solution.trim().to_string();
    if solution.is_empty() {
        return Err(TutorError::Upstream(
            "Model answer has no solution".to_string(),
        ));
    }

    match question_type {
        QuestionType::FollowUp => Ok(TutorAnswer {
            solution,
            difficulty: None,
            explanation: None,
        }),
        QuestionType::Factual | QuestionType::ProblemSolving => {
            let difficulty = non_blank(raw.difficulty).ok_or_else(|| {
                TutorError::Upstream("Model answer to a first question has no difficulty".to_string())
            })?;

            let explanation = if question_type == QuestionType::ProblemSolving {
                Some(non_blank(raw.explanation).ok_or_else(|| {
                    TutorError::Upstream(
                        "Model answer to a problem-solving question has no explanation"
                            .to_string(),
                    )
                })?)
            } else {
                None
            };

            Ok(TutorAnswer {
                solution,
                difficulty: Some(difficulty),
                explanation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(qt: Option<QuestionType>, difficulty: Option<&str>, explanation: Option<&str>) -> RawAnswer {
        RawAnswer {
            question_type: qt,
            solution: "x = 5".to_string(),
            difficulty: difficulty.map(ToString::to_string),
            explanation: explanation.map(ToString::to_string),
        }
    }

    #[test]
    fn test_turn_kind() {
        assert_eq!(TurnKind::of(0), TurnKind::First);
        assert_eq!(TurnKind::of(2), TurnKind::FollowUp);
    }

    #[test]
    fn test_first_problem_solving_keeps_both() {
        let answer = shape(
            TurnKind::First,
            raw(Some(QuestionType::ProblemSolving), Some("Beginner"), Some("Subtract 5, divide by 2")),
        )
        .unwrap();
        assert_eq!(answer.difficulty.as_deref(), Some("Beginner"));
        assert_eq!(answer.explanation.as_deref(), Some("Subtract 5, divide by 2"));
    }

    #[test]
    fn test_first_factual_drops_explanation() {
        let answer = shape(
            TurnKind::First,
            raw(Some(QuestionType::Factual), Some("Beginner"), Some("should vanish")),
        )
        .unwrap();
        assert_eq!(answer.difficulty.as_deref(), Some("Beginner"));
        assert!(answer.explanation.is_none());
    }

    #[test]
    fn test_follow_up_drops_everything_optional() {
        let answer = shape(
            TurnKind::FollowUp,
            raw(Some(QuestionType::ProblemSolving), Some("Advanced"), Some("long")),
        )
        .unwrap();
        assert_eq!(answer.solution, "x = 5");
        assert!(answer.difficulty.is_none());
        assert!(answer.explanation.is_none());
    }

    #[test]
    fn test_first_turn_requires_difficulty() {
        let err = shape(TurnKind::First, raw(Some(QuestionType::Factual), None, None)).unwrap_err();
        assert!(matches!(err, TutorError::Upstream(_)));

        let err = shape(TurnKind::First, raw(Some(QuestionType::Factual), Some("  "), None)).unwrap_err();
        assert!(matches!(err, TutorError::Upstream(_)));
    }

    #[test]
    fn test_problem_solving_requires_explanation() {
        let err = shape(
            TurnKind::First,
            raw(Some(QuestionType::ProblemSolving), Some("Beginner"), None),
        )
        .unwrap_err();
        assert!(matches!(err, TutorError::Upstream(_)));
    }

    #[test]
    fn test_empty_solution_is_upstream_error() {
        let mut answer = raw(None, Some("Beginner"), None);
        answer.solution = " ".to_string();
        assert!(shape(TurnKind::First, answer).is_err());
    }

    #[test]
    fn test_missing_label_is_inferred() {
        assert_eq!(
            effective_question_type(TurnKind::First, &raw(None, Some("B"), Some("steps"))),
            QuestionType::ProblemSolving
        );
        assert_eq!(
            effective_question_type(TurnKind::First, &raw(None, Some("B"), None)),
            QuestionType::Factual
        );
        assert_eq!(
            effective_question_type(TurnKind::First, &raw(Some(QuestionType::FollowUp), Some("B"), None)),
            QuestionType::Factual
        );
    }

    #[test]
    fn test_parse_model_json() {
        let parsed = RawAnswer::parse(
            r#"{"questionType":"problem-solving","solution":"x = 5","difficultyLevel":"Beginner","explanation":"steps"}"#,
        )
        .unwrap();
        assert_eq!(parsed.question_type, Some(QuestionType::ProblemSolving));
        assert_eq!(parsed.difficulty.as_deref(), Some("Beginner"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let parsed = RawAnswer::parse("```json\n{\"solution\":\"42\"}\n```").unwrap();
        assert_eq!(parsed.solution, "42");
        assert!(parsed.question_type.is_none());
    }

    #[test]
    fn test_parse_garbage_is_upstream_error() {
        assert!(matches!(
            RawAnswer::parse("Sure! The answer is 5."),
            Err(TutorError::Upstream(_))
        ));
    }
}
