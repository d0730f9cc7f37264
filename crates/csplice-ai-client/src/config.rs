//! AI client configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.minimax.chat/v1";
pub const DEFAULT_MODEL: &str = "minimax-m2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`crate::AnalysisClient`].
#[derive(Debug, Clone)]
pub struct AiClientConfig {
    /// Base URL of the AI service
    pub base_url: String,
    /// Bearer token; requests are sent without auth when absent
    pub api_key: Option<String>,
    /// Model name sent with every request
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl AiClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("AI_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("AI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("AI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Whether credentials are present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AiClientConfig::default();
        assert_eq!(config.base_url, "https://api.minimax.chat/v1");
        assert_eq!(config.model, "minimax-m2");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_builder() {
        let config = AiClientConfig::default()
            .with_base_url("http://localhost:9000")
            .with_api_key("secret");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert!(config.is_configured());
    }
}
