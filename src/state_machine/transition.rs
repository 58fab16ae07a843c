//! Pure state transition function

use super::state::{Submission, Turn};
use super::{ConversationState, Effect, Event, SubmissionId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Inputs to a transition that do not come from the state or the event
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    pub now: DateTime<Utc>,
}

impl TransitionContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether subscribers should see the new state
    pub fn publishes(&self) -> bool {
        self.effects.contains(&Effect::NotifySubscribers)
    }

    /// The submission this transition accepted, if any
    #[allow(dead_code)] // Used by tests
    pub fn submission(&self) -> Option<&Submission> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Dispatch { submission } => Some(submission),
            _ => None,
        })
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("No submission {0} is waiting for a model turn")]
    UnknownSubmission(SubmissionId),
}

/// Pure transition function.
///
/// Given the same state, context and event it always produces the same
/// result. The input state is never modified; the new snapshot is a copy.
pub fn transition(
    state: &ConversationState,
    context: &TransitionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::DraftTextChanged { text } => {
            let mut next = state.clone();
            next.draft_text = text;
            Ok(TransitionResult::new(next).with_effect(Effect::NotifySubscribers))
        }

        Event::DraftAttachmentChanged { attachment } => {
            let mut next = state.clone();
            next.draft_attachment = attachment;
            Ok(TransitionResult::new(next).with_effect(Effect::NotifySubscribers))
        }

        // Empty draft: no-op, nothing published, nothing dispatched
        Event::Submit if state.draft_text.is_empty() => Ok(TransitionResult::new(state.clone())),

        Event::Submit => {
            let mut next = state.clone();
            let id = next.allocate_submission_id();
            let text = std::mem::take(&mut next.draft_text);
            let attachment = next.draft_attachment.take();

            next.push_turn(Turn::user(id, text.clone(), attachment.clone(), context.now));
            next.mark_awaiting(id);

            Ok(TransitionResult::new(next)
                .with_effect(Effect::NotifySubscribers)
                .with_effect(Effect::dispatch(Submission {
                    id,
                    text,
                    attachment,
                })))
        }

        Event::ModelReply {
            submission_id,
            text,
        } => {
            if !state.is_awaiting(submission_id) {
                return Err(TransitionError::UnknownSubmission(submission_id));
            }

            let mut next = state.clone();
            next.clear_awaiting(submission_id);
            next.push_turn(Turn::model(submission_id, text, context.now));

            Ok(TransitionResult::new(next)
                .with_effect(Effect::NotifySubscribers)
                .with_effect(Effect::ReplyRecorded { submission_id }))
        }
    }
}
