use std::time::Duration;

use crate::url::DEFAULT_CHAT_BASE_URL;

/// Transport configuration for chat streaming requests.
#[derive(Debug, Clone)]
pub struct OllamaApiConfig {
    /// Base URL for the chat proxy.
    pub base_url: String,
    /// Optional request timeout applied to the whole stream.
    ///
    /// The core enforces no timeout by default: a stalled backend stream
    /// blocks until user-initiated cancellation.
    pub timeout: Option<Duration>,
}

impl Default for OllamaApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl OllamaApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
