//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Media type assumed when the image source does not report one
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// Identifies one accepted submission; its user turn and model turn share it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Model,
}

/// Opaque in-memory image picked by the user.
///
/// The bytes are shared, never decoded, and handed to the multimodal call
/// unchanged. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    bytes: Arc<[u8]>,
    media_type: String,
}

impl Attachment {
    pub fn new(bytes: impl Into<Arc<[u8]>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    /// Attachment with the default media type
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(bytes, DEFAULT_MEDIA_TYPE)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Keep image payloads out of logs
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub text: String,
    pub attachment: Option<Attachment>,
    pub origin: Origin,
    pub submission_id: SubmissionId,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(
        submission_id: SubmissionId,
        text: String,
        attachment: Option<Attachment>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            text,
            attachment,
            origin: Origin::User,
            submission_id,
            created_at,
        }
    }

    pub fn model(submission_id: SubmissionId, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            text,
            attachment: None,
            origin: Origin::Model,
            submission_id,
            created_at,
        }
    }
}

/// A prompt accepted by `submit`, handed to the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: SubmissionId,
    pub text: String,
    pub attachment: Option<Attachment>,
}

/// Complete conversation snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationState {
    /// Newest first; shared between snapshots
    turns: VecDeque<Arc<Turn>>,
    pub draft_text: String,
    pub draft_attachment: Option<Attachment>,
    /// Submissions whose model turn has not landed yet
    awaiting_reply: BTreeSet<SubmissionId>,
    next_submission_id: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns, newest first
    pub fn turns(&self) -> impl ExactSizeIterator<Item = &Turn> + '_ {
        self.turns.iter().map(|turn| &**turn)
    }

    #[allow(dead_code)] // Used by tests
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    #[allow(dead_code)] // Used by tests
    pub fn latest_turn(&self) -> Option<&Turn> {
        self.turns.front().map(|turn| &**turn)
    }

    pub fn awaiting_reply(&self) -> &BTreeSet<SubmissionId> {
        &self.awaiting_reply
    }

    pub fn is_awaiting(&self, id: SubmissionId) -> bool {
        self.awaiting_reply.contains(&id)
    }

    /// No submission is waiting for its model turn
    pub fn is_idle(&self) -> bool {
        self.awaiting_reply.is_empty()
    }

    pub(super) fn push_turn(&mut self, turn: Turn) {
        self.turns.push_front(Arc::new(turn));
    }

    pub(super) fn allocate_submission_id(&mut self) -> SubmissionId {
        self.next_submission_id += 1;
        SubmissionId(self.next_submission_id)
    }

    pub(super) fn mark_awaiting(&mut self, id: SubmissionId) {
        self.awaiting_reply.insert(id);
    }

    pub(super) fn clear_awaiting(&mut self, id: SubmissionId) -> bool {
        self.awaiting_reply.remove(&id)
    }
}
