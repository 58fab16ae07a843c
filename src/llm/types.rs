//! Common types for generation calls

/// Result of one generation call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Concatenated text of the first candidate; may be empty
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

#[allow(dead_code)] // Used by tests
impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some("STOP".to_string()),
            usage: Usage::default(),
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    #[allow(dead_code)] // Utility method
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
