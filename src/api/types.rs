//! API request and response types

use crate::state_machine::{Attachment, ConversationState, Origin, SubmissionId, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to replace the draft text
#[derive(Debug, Deserialize)]
pub struct DraftTextRequest {
    pub text: String,
}

/// Request to set the draft image
#[derive(Debug, Deserialize)]
pub struct DraftAttachmentRequest {
    /// Base64-encoded image bytes
    pub data: String,
    #[serde(default)]
    pub media_type: Option<String>,
}

/// Response for submit
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// ============================================================
// Rendered conversation
// ============================================================

/// What the presentation layer draws for one snapshot.
///
/// A pure function of the snapshot: rendering the same snapshot twice gives
/// the same view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationView {
    /// Newest first
    pub turns: Vec<TurnView>,
    pub draft: DraftView,
    /// A reply is still outstanding
    pub awaiting_reply: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnView {
    pub submission_id: SubmissionId,
    pub origin: Origin,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftView {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentView>,
}

/// Image metadata; pixel data stays on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentView {
    pub media_type: String,
    pub size_bytes: usize,
}

impl ConversationView {
    pub fn render(state: &ConversationState) -> Self {
        Self {
            turns: state.turns().map(TurnView::render).collect(),
            draft: DraftView {
                text: state.draft_text.clone(),
                attachment: state.draft_attachment.as_ref().map(AttachmentView::render),
            },
            awaiting_reply: !state.is_idle(),
        }
    }
}

impl TurnView {
    fn render(turn: &Turn) -> Self {
        Self {
            submission_id: turn.submission_id,
            origin: turn.origin,
            text: turn.text.clone(),
            attachment: turn.attachment.as_ref().map(AttachmentView::render),
            created_at: turn.created_at,
        }
    }
}

impl AttachmentView {
    fn render(attachment: &Attachment) -> Self {
        Self {
            media_type: attachment.media_type().to_string(),
            size_bytes: attachment.len(),
        }
    }
}
