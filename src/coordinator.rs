//! Response coordinator
//!
//! Bridges one submitted prompt to one generation call and one model-turn
//! text. Failures stop here: every dispatch ends in a displayable outcome.

use crate::llm::{Generation, GenerationApi, LlmError};
use crate::state_machine::Submission;
use std::time::Duration;

/// Model turn text when the service answers with nothing
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "error responding";
/// Model turn text when a failure carries no message
pub const MISSING_ERROR_PLACEHOLDER: &str = "error caught";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Timeout and retry settings for a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound on a single attempt
    pub request_timeout: Duration,
    /// Attempts per dispatch, first one included
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Terminal state of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(String),
    Failed(String),
}

impl DispatchOutcome {
    pub fn from_result(result: Result<Generation, LlmError>) -> Self {
        match result {
            Ok(generation) => DispatchOutcome::Completed(generation.text),
            Err(e) => DispatchOutcome::Failed(e.message),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }

    /// Both outcomes become an ordinary model turn
    pub fn into_turn_text(self) -> String {
        match self {
            DispatchOutcome::Completed(text) if text.is_empty() => {
                EMPTY_RESPONSE_PLACEHOLDER.to_string()
            }
            DispatchOutcome::Failed(message) if message.is_empty() => {
                MISSING_ERROR_PLACEHOLDER.to_string()
            }
            DispatchOutcome::Completed(text) | DispatchOutcome::Failed(text) => text,
        }
    }
}

pub struct ResponseCoordinator<L: GenerationApi> {
    api: L,
    config: CoordinatorConfig,
}

impl<L: GenerationApi> ResponseCoordinator<L> {
    pub fn new(api: L, config: CoordinatorConfig) -> Self {
        Self { api, config }
    }

    #[allow(dead_code)] // Used by tests
    pub fn api(&self) -> &L {
        &self.api
    }

    /// Run the generation call for a submission.
    ///
    /// Text-only prompts use the text endpoint, prompts with an image the
    /// multimodal one. A retryable failure is retried until `max_attempts`
    /// is reached; anything else is returned as a failed outcome.
    pub async fn dispatch(&self, submission: &Submission) -> DispatchOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = self.attempt(submission).await;
            match result {
                Err(e) if e.kind.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        submission_id = %submission.id,
                        attempt,
                        error = %e,
                        "Generation failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                result => {
                    let outcome = DispatchOutcome::from_result(result);
                    tracing::info!(
                        submission_id = %submission.id,
                        attempt,
                        failed = outcome.is_failure(),
                        "Dispatch finished"
                    );
                    return outcome;
                }
            }
        }
    }

    async fn attempt(&self, submission: &Submission) -> Result<Generation, LlmError> {
        let call = async {
            match &submission.attachment {
                None => self.api.generate_text(&submission.text).await,
                Some(image) => self.api.generate_multimodal(image, &submission.text).await,
            }
        };

        tokio::time::timeout(self.config.request_timeout, call)
            .await
            .map_err(|_| {
                LlmError::timeout(format!(
                    "Request timed out after {}ms",
                    self.config.request_timeout.as_millis()
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockGenerationApi;
    use crate::state_machine::{Attachment, SubmissionId};

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig {
            request_timeout: Duration::from_millis(200),
            max_attempts: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn submission(text: &str, attachment: Option<Attachment>) -> Submission {
        Submission {
            id: SubmissionId(1),
            text: text.to_string(),
            attachment,
        }
    }

    #[tokio::test]
    async fn test_text_prompt_uses_text_endpoint() {
        let api = MockGenerationApi::new();
        api.queue_text("Hi there");
        let coordinator = ResponseCoordinator::new(api, fast_config());

        let outcome = coordinator.dispatch(&submission("Hello", None)).await;
        assert_eq!(outcome, DispatchOutcome::Completed("Hi there".to_string()));

        let calls = coordinator.api().recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "Hello");
        assert!(calls[0].image.is_none());
    }

    #[tokio::test]
    async fn test_image_prompt_uses_multimodal_endpoint() {
        let image = Attachment::from_bytes(vec![1u8, 2, 3]);
        let api = MockGenerationApi::new();
        api.queue_text("A cat");
        let coordinator = ResponseCoordinator::new(api, fast_config());

        coordinator
            .dispatch(&submission("Describe this", Some(image.clone())))
            .await;

        let calls = coordinator.api().recorded_calls();
        assert_eq!(calls[0].image, Some(image));
        assert_eq!(calls[0].prompt, "Describe this");
    }

    #[tokio::test]
    async fn test_failure_message_becomes_turn_text() {
        let api = MockGenerationApi::new();
        api.queue_error(LlmError::invalid_request("quota exceeded"));
        let coordinator = ResponseCoordinator::new(api, fast_config());

        let outcome = coordinator.dispatch(&submission("Hello", None)).await;
        assert!(outcome.is_failure());
        assert_eq!(outcome.into_turn_text(), "quota exceeded");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            DispatchOutcome::Completed(String::new()).into_turn_text(),
            EMPTY_RESPONSE_PLACEHOLDER
        );
        assert_eq!(
            DispatchOutcome::Failed(String::new()).into_turn_text(),
            MISSING_ERROR_PLACEHOLDER
        );
    }

    #[tokio::test]
    async fn test_retryable_failure_retried_once() {
        let api = MockGenerationApi::new();
        api.queue_error(LlmError::server_error("Server error: overloaded"));
        api.queue_text("second time lucky");
        let coordinator = ResponseCoordinator::new(api, fast_config());

        let outcome = coordinator.dispatch(&submission("Hello", None)).await;
        assert_eq!(outcome.into_turn_text(), "second time lucky");
        assert_eq!(coordinator.api().call_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let api = MockGenerationApi::new();
        api.queue_error(LlmError::network("down"));
        api.queue_error(LlmError::network("still down"));
        api.queue_text("never reached");
        let coordinator = ResponseCoordinator::new(api, fast_config());

        let outcome = coordinator.dispatch(&submission("Hello", None)).await;
        assert_eq!(outcome, DispatchOutcome::Failed("still down".to_string()));
        assert_eq!(coordinator.api().call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_not_retried() {
        let api = MockGenerationApi::new();
        api.queue_error(LlmError::auth("Authentication failed: bad key"));
        api.queue_text("never reached");
        let coordinator = ResponseCoordinator::new(api, fast_config());

        let outcome = coordinator.dispatch(&submission("Hello", None)).await;
        assert!(outcome.is_failure());
        assert_eq!(coordinator.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_hung_call_times_out() {
        let api = MockGenerationApi::new();
        api.queue_delayed(Ok(Generation::text("too late")), Duration::from_secs(30));
        api.queue_delayed(Ok(Generation::text("too late")), Duration::from_secs(30));
        let coordinator = ResponseCoordinator::new(api, fast_config());

        let outcome = coordinator.dispatch(&submission("Hello", None)).await;
        assert!(outcome.is_failure());
        assert!(outcome.into_turn_text().contains("timed out"));
        assert_eq!(coordinator.api().call_count(), 2);
    }
}
