//! Property-based tests for the tutor pipeline
//!
//! - Explanation depth never shrinks as engagement or performance drop
//! - Shaped answers obey the field rules for their turn, whatever the model sent
//! - The outgoing request always ends with the trimmed question

use super::prompt::{build_request, ExplanationDepth, GenerationSettings};
use super::shaping::{shape, QuestionType, RawAnswer, TurnKind};
use super::{DeliveryMode, StudentProfile, Turn, TutorRequest};
use crate::llm::MessageRole;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_unit() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

fn arb_question_type() -> impl Strategy<Value = Option<QuestionType>> {
    proptest::option::of(prop_oneof![
        Just(QuestionType::Factual),
        Just(QuestionType::ProblemSolving),
        Just(QuestionType::FollowUp),
    ])
}

fn arb_optional_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[ a-zA-Z0-9.]{0,30}")
}

fn arb_raw_answer() -> impl Strategy<Value = RawAnswer> {
    (
        arb_question_type(),
        "[ a-zA-Z0-9=.]{0,40}",
        arb_optional_text(),
        arb_optional_text(),
    )
        .prop_map(|(question_type, solution, difficulty, explanation)| RawAnswer {
            question_type,
            solution,
            difficulty,
            explanation,
        })
}

fn arb_history() -> impl Strategy<Value = Vec<Turn>> {
    proptest::collection::vec(
        ("[a-z ]{0,20}", any::<bool>()).prop_map(|(text, is_user)| {
            if is_user {
                Turn::user(text)
            } else {
                Turn::assistant(text)
            }
        }),
        0..6,
    )
}

// ============================================================================
// Depth
// ============================================================================

proptest! {
    /// Lowering either signal never yields a shorter explanation target
    #[test]
    fn prop_depth_monotonic(
        e1 in arb_unit(), e2 in arb_unit(),
        p1 in arb_unit(), p2 in arb_unit(),
    ) {
        let (e_lo, e_hi) = if e1 <= e2 { (e1, e2) } else { (e2, e1) };
        let (p_lo, p_hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };

        let low = ExplanationDepth::for_profile(e_lo, p_lo);
        let high = ExplanationDepth::for_profile(e_hi, p_hi);
        prop_assert!(
            low.target_words >= high.target_words,
            "({}, {}) -> {} words but ({}, {}) -> {} words",
            e_lo, p_lo, low.target_words, e_hi, p_hi, high.target_words
        );
        prop_assert!(low.register <= high.register);
    }

    #[test]
    fn prop_depth_bounded(e in arb_unit(), p in arb_unit()) {
        let depth = ExplanationDepth::for_profile(e, p);
        prop_assert!((80..=360).contains(&depth.target_words));
    }
}

// ============================================================================
// Shaping
// ============================================================================

proptest! {
    /// A follow-up never carries difficulty or explanation
    #[test]
    fn prop_follow_up_strips_optional_fields(raw in arb_raw_answer()) {
        if let Ok(answer) = shape(TurnKind::FollowUp, raw) {
            prop_assert!(answer.difficulty.is_none());
            prop_assert!(answer.explanation.is_none());
            prop_assert!(!answer.solution.is_empty());
        }
    }

    /// A first-turn answer always has a difficulty; an explanation only when
    /// the question is problem-solving
    #[test]
    fn prop_first_turn_field_rules(raw in arb_raw_answer()) {
        let explained = raw.question_type == Some(QuestionType::ProblemSolving)
            || (raw.question_type.is_none()
                && raw.explanation.as_deref().is_some_and(|e| !e.trim().is_empty()));

        if let Ok(answer) = shape(TurnKind::First, raw) {
            prop_assert!(answer.difficulty.as_deref().is_some_and(|d| !d.is_empty()));
            prop_assert_eq!(answer.explanation.is_some(), explained);
        }
    }

    /// Shaping only fails when the model left out something required
    #[test]
    fn prop_follow_up_fails_only_without_solution(raw in arb_raw_answer()) {
        let blank = raw.solution.trim().is_empty();
        prop_assert_eq!(shape(TurnKind::FollowUp, raw).is_err(), blank);
    }
}

// ============================================================================
// Request building
// ============================================================================

proptest! {
    #[test]
    fn prop_request_ends_with_question(
        question in "[a-zA-Z?]{1,40}",
        history in arb_history(),
        e in arb_unit(),
        p in arb_unit(),
        single in any::<bool>(),
    ) {
        let non_blank = history.iter().filter(|t| !t.content.trim().is_empty()).count();
        let request = TutorRequest::new(format!("  {question} "), StudentProfile::new(e, p), history);
        let mode = if single { DeliveryMode::Single } else { DeliveryMode::Stream };

        let llm = build_request(&request, mode, GenerationSettings::default());
        prop_assert_eq!(llm.messages.len(), non_blank + 1);
        let last = llm.messages.last().unwrap();
        prop_assert_eq!(last.role, MessageRole::User);
        prop_assert_eq!(&last.text, &question);
    }
}
