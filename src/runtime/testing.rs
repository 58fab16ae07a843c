//! Mock implementations for testing
//!
//! These mocks enable session and coordinator tests without real I/O.

use crate::llm::{Generation, GenerationApi, LlmError, Usage};
use crate::state_machine::Attachment;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Generation API
// ============================================================================

/// One recorded call to the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub image: Option<Attachment>,
}

struct QueuedReply {
    result: Result<Generation, LlmError>,
    delay: Option<Duration>,
}

/// Mock generation API that returns queued replies in call order
pub struct MockGenerationApi {
    replies: Mutex<VecDeque<QueuedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MockGenerationApi {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue a successful reply
    pub fn queue_text(&self, text: &str) {
        self.queue(Ok(Generation {
            text: text.to_string(),
            finish_reason: Some("STOP".to_string()),
            usage: Usage {
                input_tokens: 1,
                output_tokens: 1,
            },
        }));
    }

    /// Queue an error reply
    pub fn queue_error(&self, error: LlmError) {
        self.queue(Err(error));
    }

    pub fn queue(&self, result: Result<Generation, LlmError>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(QueuedReply { result, delay: None });
    }

    /// Queue a reply that arrives after `delay`
    pub fn queue_delayed(&self, result: Result<Generation, LlmError>, delay: Duration) {
        self.replies.lock().unwrap().push_back(QueuedReply {
            result,
            delay: Some(delay),
        });
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn reply(&self, prompt: &str, image: Option<&Attachment>) -> Result<Generation, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            image: image.cloned(),
        });
        let queued = self.replies.lock().unwrap().pop_front();

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let Some(QueuedReply { result, delay }) = queued else {
            return Err(LlmError::network("No mock response queued"));
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

impl Default for MockGenerationApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter even when the call is dropped by a timeout
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationApi for MockGenerationApi {
    async fn generate_text(&self, prompt: &str) -> Result<Generation, LlmError> {
        self.reply(prompt, None).await
    }

    async fn generate_multimodal(
        &self,
        image: &Attachment,
        prompt: &str,
    ) -> Result<Generation, LlmError> {
        self.reply(prompt, Some(image)).await
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
