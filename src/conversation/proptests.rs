//! Property-based tests for conversation state
//!
//! - Fragments land in delivery order; the final text is their concatenation
//! - A failure never erases fragments already applied
//! - Only failed exchanges are left out of the outgoing history

use super::{ConversationManager, FALLBACK_MESSAGE};
use crate::tutor::{Role, StudentProfile};
use proptest::prelude::*;

fn arb_fragments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z0-9 \\n*#`éü]{0,12}", 0..20)
}

proptest! {
    #[test]
    fn prop_fragments_concatenate_in_order(fragments in arb_fragments()) {
        let mut conv = ConversationManager::new();
        conv.submit("question", StudentProfile::default()).unwrap();
        for fragment in &fragments {
            prop_assert!(conv.on_fragment(fragment));
        }
        conv.on_complete(None);

        let expected = fragments.concat();
        let last = conv.last().unwrap();
        if expected.is_empty() {
            prop_assert_eq!(&last.content, FALLBACK_MESSAGE);
        } else {
            prop_assert_eq!(&last.content, &expected);
            prop_assert!(!last.is_failed());
        }
    }

    #[test]
    fn prop_error_preserves_partial_output(
        fragments in arb_fragments(),
        message in "[a-z ]{0,20}",
    ) {
        let mut conv = ConversationManager::new();
        conv.submit("question", StudentProfile::default()).unwrap();
        for fragment in &fragments {
            conv.on_fragment(fragment);
        }
        conv.on_error(&message);

        let partial = fragments.concat();
        let last = conv.last().unwrap();
        prop_assert!(last.is_failed());
        prop_assert!(!last.content.is_empty());
        prop_assert!(!conv.is_busy());
        if !partial.is_empty() {
            prop_assert_eq!(&last.content, &partial);
            prop_assert!(last.display().starts_with(&partial));
            prop_assert!(last.display().ends_with(FALLBACK_MESSAGE));
        }
    }

    /// Each exchange either succeeds or fails; history keeps the successful
    /// ones, in order, as user/assistant pairs
    #[test]
    fn prop_history_keeps_successful_exchanges(outcomes in proptest::collection::vec(any::<bool>(), 0..8)) {
        let mut conv = ConversationManager::new();
        for (i, ok) in outcomes.iter().enumerate() {
            conv.submit(&format!("q{i}"), StudentProfile::default()).unwrap();
            if *ok {
                conv.on_fragment(&format!("a{i}"));
                conv.on_complete(None);
            } else {
                conv.on_error("failed");
            }
        }

        let history = conv.history();
        let successes = outcomes.iter().filter(|ok| **ok).count();
        prop_assert_eq!(history.len(), successes * 2);
        for pair in history.chunks(2) {
            prop_assert_eq!(pair[0].role, Role::User);
            prop_assert_eq!(pair[1].role, Role::Assistant);
            prop_assert_eq!(pair[0].content.strip_prefix('q'), pair[1].content.strip_prefix('a'));
        }
    }
}
