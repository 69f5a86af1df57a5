//! Client-side conversation state
//!
//! The [`ConversationManager`] owns the ordered turn list of one chat
//! session. A submission appends the user turn plus an empty assistant
//! placeholder; the response then lands in that placeholder, either
//! fragment by fragment or as one structured answer.

#[cfg(test)]
mod proptests;

use crate::tutor::{validate_question, Role, StudentProfile, Turn, TutorAnswer, TutorError, TutorRequest};

/// Shown in place of an answer that could not be produced
pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, I encountered an error. Please check your API key or try again.";

#[derive(Debug, Default)]
pub struct ConversationManager {
    turns: Vec<Turn>,
    busy: bool,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True while a response is in flight
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Start a new exchange.
    ///
    /// Returns `Ok(None)` without touching state while another response is
    /// in flight. Otherwise appends the user turn and an empty placeholder
    /// and returns the request to send; its history is every earlier turn
    /// except failed exchanges.
    pub fn submit(
        &mut self,
        question: &str,
        profile: StudentProfile,
    ) -> Result<Option<TutorRequest>, TutorError> {
        if self.busy {
            return Ok(None);
        }
        let question = question.trim();
        validate_question(question)?;
        profile.validate()?;

        let history = self.history();

        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(""));
        self.busy = true;

        Ok(Some(TutorRequest::new(question, profile, history)))
    }

    /// Append a streamed fragment to the open placeholder.
    ///
    /// Ignored (returns `false`) when no response is in flight.
    pub fn on_fragment(&mut self, fragment: &str) -> bool {
        match self.open_placeholder() {
            Some(turn) => {
                turn.content.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// Close the exchange.
    ///
    /// A structured answer replaces the placeholder wholesale. Without one
    /// the streamed content stays; a stream that produced nothing is treated
    /// as a failure.
    pub fn on_complete(&mut self, answer: Option<TutorAnswer>) {
        let Some(turn) = self.open_placeholder() else {
            return;
        };

        match answer {
            Some(answer) => {
                turn.content = answer.solution;
                turn.difficulty = answer.difficulty;
                turn.explanation = answer.explanation;
                turn.error = None;
            }
            None if turn.content.is_empty() => {
                tracing::warn!("Response finished without any content");
                mark_failed(turn);
            }
            None => {}
        }
        self.busy = false;
    }

    /// Fail the exchange. Content already streamed is kept as is.
    pub fn on_error(&mut self, message: &str) {
        let Some(turn) = self.open_placeholder() else {
            return;
        };
        tracing::warn!(
            partial_chars = turn.content.chars().count(),
            error = message,
            "Response failed"
        );
        mark_failed(turn);
        self.busy = false;
    }

    /// Turns to send as context for the next question
    pub fn history(&self) -> Vec<Turn> {
        let mut out = Vec::with_capacity(self.turns.len());
        for (i, turn) in self.turns.iter().enumerate() {
            let answer_failed = turn.role == Role::User
                && self
                    .turns
                    .get(i + 1)
                    .is_some_and(|next| next.role == Role::Assistant && next.is_failed());
            if turn.is_failed() || answer_failed {
                continue;
            }
            out.push(turn.clone());
        }
        out
    }

    fn open_placeholder(&mut self) -> Option<&mut Turn> {
        if !self.busy {
            return None;
        }
        self.turns
            .last_mut()
            .filter(|turn| turn.role == Role::Assistant)
    }
}

fn mark_failed(turn: &mut Turn) {
    if turn.content.is_empty() {
        turn.content = FALLBACK_MESSAGE.to_string();
    }
    turn.error = Some(FALLBACK_MESSAGE.to_string());
}
