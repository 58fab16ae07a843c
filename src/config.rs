//! Process configuration from the environment

use crate::coordinator::CoordinatorConfig;
use crate::llm::LlmConfig;
use crate::runtime::DispatchPolicy;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Everything `main` needs to start the server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub dispatch_policy: DispatchPolicy,
    pub coordinator: CoordinatorConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm = LlmConfig::from_lookup(&lookup);
        if !llm.has_api_key() {
            return Err(ConfigError::MissingApiKey);
        }

        let port = match get("GEMINI_TALKS_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid {
                    key: "GEMINI_TALKS_PORT",
                    message: e.to_string(),
                })?,
            None => DEFAULT_PORT,
        };

        let dispatch_policy = match get("GEMINI_TALKS_DISPATCH") {
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                key: "GEMINI_TALKS_DISPATCH",
                message,
            })?,
            None => DispatchPolicy::default(),
        };

        let defaults = CoordinatorConfig::default();
        let coordinator = CoordinatorConfig {
            request_timeout: parse_duration(&get, "GEMINI_TIMEOUT_SECS", Duration::from_secs)?
                .unwrap_or(defaults.request_timeout),
            retry_delay: parse_duration(&get, "GEMINI_RETRY_DELAY_MS", Duration::from_millis)?
                .unwrap_or(defaults.retry_delay),
            max_attempts: defaults.max_attempts,
        };

        Ok(Self {
            port,
            dispatch_policy,
            coordinator,
            llm,
        })
    }
}

fn parse_duration(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError> {
    get(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(unit)
                .map_err(|e| ConfigError::Invalid {
                    key,
                    message: e.to_string(),
                })
        })
        .transpose()
}
