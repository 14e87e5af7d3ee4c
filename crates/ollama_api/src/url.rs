/// Default base URL for the chat proxy.
pub const DEFAULT_CHAT_BASE_URL: &str = "http://localhost:9000";

/// Normalize a base URL to the chat streaming endpoint.
///
/// Normalization rules:
/// 1) keep a URL already ending in `/callollama` unchanged
/// 2) append `/callollama` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/callollama") {
        return trimmed.to_string();
    }
    format!("{trimmed}/callollama")
}
