use std::sync::{Arc, OnceLock};

use regex::Regex;
use review_api::ReviewApiClient;

fn reference_marker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"@doc1|@doc2").expect("marker pattern is valid"))
}

/// True when the message opts in to document retrieval.
pub fn has_reference_marker(message: &str) -> bool {
    reference_marker_regex().is_match(message)
}

/// The prompt actually sent upstream, plus the page numbers backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedPrompt {
    pub content: String,
    pub page_sources: Vec<u32>,
}

impl AugmentedPrompt {
    fn passthrough(message: &str) -> Self {
        Self {
            content: message.to_string(),
            page_sources: Vec::new(),
        }
    }
}

/// Decides per message whether to splice retrieved passages into the
/// outgoing prompt.
///
/// Messages without a reference marker skip retrieval entirely. When
/// retrieval fails the message still goes out unaugmented; chat keeps
/// working without the review backend.
pub struct RetrievalGate {
    api: Arc<ReviewApiClient>,
}

impl RetrievalGate {
    pub fn new(api: Arc<ReviewApiClient>) -> Self {
        Self { api }
    }

    pub async fn prepare(&self, message: &str, source_count: u32) -> AugmentedPrompt {
        if !has_reference_marker(message) {
            return AugmentedPrompt::passthrough(message);
        }

        match self.api.document_qa(message, source_count).await {
            Ok(result) => AugmentedPrompt {
                content: format!(
                    "{}\n\n Using the given text, answer the following question. \
                     ENSURE THE ANSWER REFLECTS THE TEXT: {}",
                    result.documents, message
                ),
                page_sources: result.page_numbers,
            },
            Err(error) => {
                tracing::warn!(%error, "document retrieval failed, sending unaugmented message");
                AugmentedPrompt::passthrough(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{has_reference_marker, AugmentedPrompt};

    #[test]
    fn marker_detection() {
        assert!(has_reference_marker("@doc1 what is the refund policy?"));
        assert!(has_reference_marker("summarize @doc2 please"));
        assert!(!has_reference_marker("what is the refund policy?"));
        assert!(!has_reference_marker("@doc3 is not a known marker"));
    }

    #[test]
    fn passthrough_keeps_message_and_has_no_sources() {
        let prompt = AugmentedPrompt::passthrough("hello");
        assert_eq!(prompt.content, "hello");
        assert!(prompt.page_sources.is_empty());
    }
}
