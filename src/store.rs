//! Conversation store
//!
//! Single source of truth for the conversation and the draft. Every
//! mutation runs the pure transition on the current snapshot and publishes
//! a fresh `Arc<ConversationState>`; published snapshots are never touched
//! again. The watch sender is the single writer, so concurrent callers are
//! serialized and no update is lost.

use crate::state_machine::{
    transition, Attachment, ConversationState, Effect, Event, Submission, SubmissionId,
    TransitionContext, TransitionError, TransitionResult,
};
use std::sync::Arc;
use tokio::sync::watch;

pub type Snapshot = Arc<ConversationState>;

pub struct ConversationStore {
    tx: watch::Sender<Snapshot>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(ConversationState::new()));
        Self { tx }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn update_draft_text(&self, text: impl Into<String>) {
        let event = Event::DraftTextChanged { text: text.into() };
        // Draft edits cannot fail
        let _ = self.apply(event);
    }

    pub fn update_draft_attachment(&self, attachment: Option<Attachment>) {
        let _ = self.apply(Event::DraftAttachmentChanged { attachment });
    }

    /// Accept the draft as a prompt.
    ///
    /// Returns `None` (and leaves the state untouched) when the draft text
    /// is empty.
    pub fn submit(&self) -> Option<Submission> {
        let effects = self.apply(Event::Submit).ok()?;
        let submission = effects.into_iter().find_map(|effect| match effect {
            Effect::Dispatch { submission } => Some(submission),
            _ => None,
        })?;
        tracing::debug!(
            submission_id = %submission.id,
            has_attachment = submission.attachment.is_some(),
            "Prompt submitted"
        );
        Some(submission)
    }

    /// Record the model turn for a submission. Exactly one per submission.
    pub fn append_model_turn(
        &self,
        submission_id: SubmissionId,
        text: impl Into<String>,
    ) -> Result<(), TransitionError> {
        let event = Event::ModelReply {
            submission_id,
            text: text.into(),
        };
        for effect in self.apply(event)? {
            if let Effect::ReplyRecorded { submission_id } = effect {
                tracing::debug!(%submission_id, "Model turn recorded");
            }
        }
        Ok(())
    }

    fn apply(&self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let kind = event.kind();
        let context = TransitionContext::now();
        let mut outcome = None;

        self.tx.send_if_modified(|current| {
            match transition(current, &context, event) {
                Ok(result) => {
                    let publish = result.publishes();
                    let TransitionResult { new_state, effects } = result;
                    if publish {
                        *current = Arc::new(new_state);
                    }
                    outcome = Some(Ok(effects));
                    publish
                }
                Err(e) => {
                    outcome = Some(Err(e));
                    false
                }
            }
        });

        let outcome = outcome.unwrap_or_else(|| unreachable!("send_if_modified runs the closure"));
        if let Err(e) = &outcome {
            tracing::warn!(event = kind, error = %e, "Rejected conversation event");
        }
        outcome
    }
}
