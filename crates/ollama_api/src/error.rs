use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OllamaApiError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),
    #[error("request was cancelled")]
    Cancelled,
}

/// Best-effort human-readable message for a non-2xx response body.
pub(crate) fn status_message(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
