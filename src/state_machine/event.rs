//! Events that can occur in a conversation

use super::state::{Attachment, SubmissionId};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Draft events
    DraftTextChanged {
        text: String,
    },
    DraftAttachmentChanged {
        attachment: Option<Attachment>,
    },

    // User events
    Submit,

    // Coordinator events
    ModelReply {
        submission_id: SubmissionId,
        text: String,
    },
}

impl Event {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Event::DraftTextChanged { .. } => "draft_text_changed",
            Event::DraftAttachmentChanged { .. } => "draft_attachment_changed",
            Event::Submit => "submit",
            Event::ModelReply { .. } => "model_reply",
        }
    }
}
