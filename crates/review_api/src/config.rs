use std::time::Duration;

/// Default base URL for the review backend.
pub const DEFAULT_REVIEW_BASE_URL: &str = "http://localhost:9001";

/// Transport configuration for review backend requests.
#[derive(Debug, Clone)]
pub struct ReviewApiConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl Default for ReviewApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REVIEW_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl ReviewApiConfig {
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
