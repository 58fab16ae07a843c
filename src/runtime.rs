//! Chat session runtime
//!
//! Wires the conversation store to the response coordinator. Submissions are
//! accepted synchronously; their generation calls run on background tasks
//! and report back through the store, which is the only writer of state.

#[cfg(test)]
pub mod testing;

use crate::coordinator::ResponseCoordinator;
use crate::llm::GenerationApi;
use crate::state_machine::{Attachment, Submission, SubmissionId};
use crate::store::{ConversationStore, Snapshot};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Type alias for the production session
pub type ProductionSession = ChatSession<Arc<dyn GenerationApi>>;

/// How submissions made while a reply is outstanding are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// One call in flight at a time; model turns land in submission order
    #[default]
    Serialized,
    /// Every submission is dispatched at once; model turns land in
    /// completion order
    Concurrent,
}

impl FromStr for DispatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialized" | "serial" => Ok(Self::Serialized),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!(
                "unknown dispatch policy '{other}' (expected 'serialized' or 'concurrent')"
            )),
        }
    }
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialized => write!(f, "serialized"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

enum Dispatcher {
    Queue(mpsc::UnboundedSender<Submission>),
    Spawn,
}

/// One chat session: the store, the coordinator, and the dispatch schedule
pub struct ChatSession<L>
where
    L: GenerationApi + 'static,
{
    store: Arc<ConversationStore>,
    coordinator: Arc<ResponseCoordinator<L>>,
    dispatcher: Dispatcher,
}

impl<L> ChatSession<L>
where
    L: GenerationApi + 'static,
{
    /// Create a session. Must be called inside a tokio runtime.
    pub fn new(coordinator: ResponseCoordinator<L>, policy: DispatchPolicy) -> Self {
        let store = Arc::new(ConversationStore::new());
        let coordinator = Arc::new(coordinator);

        let dispatcher = match policy {
            DispatchPolicy::Serialized => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_dispatch_worker(
                    Arc::clone(&store),
                    Arc::clone(&coordinator),
                    rx,
                ));
                Dispatcher::Queue(tx)
            }
            DispatchPolicy::Concurrent => Dispatcher::Spawn,
        };

        tracing::info!(%policy, "Chat session started");

        Self {
            store,
            coordinator,
            dispatcher,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    pub fn update_draft_text(&self, text: impl Into<String>) {
        self.store.update_draft_text(text);
    }

    pub fn update_draft_attachment(&self, attachment: Option<Attachment>) {
        self.store.update_draft_attachment(attachment);
    }

    /// Submit the draft.
    ///
    /// Returns the accepted submission's id, or `None` when the draft text
    /// was empty. The model turn is appended later, once the call finishes.
    pub fn submit(&self) -> Option<SubmissionId> {
        let submission = self.store.submit()?;
        let id = submission.id;

        match &self.dispatcher {
            Dispatcher::Queue(tx) => {
                if let Err(mpsc::error::SendError(submission)) = tx.send(submission) {
                    // Worker is gone; the submission still needs its model turn
                    tracing::error!(submission_id = %id, "Dispatch worker stopped");
                    record_reply(&self.store, submission.id, "dispatch worker stopped".to_string());
                }
            }
            Dispatcher::Spawn => {
                let store = Arc::clone(&self.store);
                let coordinator = Arc::clone(&self.coordinator);
                tokio::spawn(async move {
                    complete_submission(&store, &coordinator, submission).await;
                });
            }
        }

        Some(id)
    }

    /// Wait until every accepted submission has its model turn
    pub async fn wait_idle(&self) {
        let mut rx = self.store.subscribe();
        // The sender lives in self.store, so the channel cannot close here
        let _ = rx.wait_for(|snapshot| snapshot.is_idle()).await;
    }
}

async fn run_dispatch_worker<L: GenerationApi>(
    store: Arc<ConversationStore>,
    coordinator: Arc<ResponseCoordinator<L>>,
    mut rx: mpsc::UnboundedReceiver<Submission>,
) {
    while let Some(submission) = rx.recv().await {
        complete_submission(&store, &coordinator, submission).await;
    }
    tracing::debug!("Dispatch worker stopped");
}

async fn complete_submission<L: GenerationApi>(
    store: &ConversationStore,
    coordinator: &ResponseCoordinator<L>,
    submission: Submission,
) {
    tracing::debug!(submission_id = %submission.id, "Dispatching submission");
    let outcome = coordinator.dispatch(&submission).await;
    record_reply(store, submission.id, outcome.into_turn_text());
}

fn record_reply(store: &ConversationStore, id: SubmissionId, text: String) {
    if let Err(e) = store.append_model_turn(id, text) {
        tracing::error!(submission_id = %id, error = %e, "Failed to record model turn");
    }
}
