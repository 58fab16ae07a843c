//! Effects produced by state transitions

use super::state::{Submission, SubmissionId};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Publish the new snapshot to subscribers
    NotifySubscribers,

    /// Hand an accepted prompt to the response coordinator
    Dispatch { submission: Submission },

    /// A submission received its model turn
    ReplyRecorded { submission_id: SubmissionId },
}

impl Effect {
    pub fn dispatch(submission: Submission) -> Self {
        Effect::Dispatch { submission }
    }
}
