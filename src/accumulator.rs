/// Growing answer buffer for one streaming job.
///
/// Deltas are applied in arrival order; the full buffer is the single
/// source of truth for "the message as currently known". When page
/// sources were supplied, completion appends a footer exactly once, even
/// under duplicate terminal records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerAccumulator {
    text: String,
    page_sources: Vec<u32>,
    footer_applied: bool,
}

impl AnswerAccumulator {
    pub fn new(page_sources: Vec<u32>) -> Self {
        Self {
            text: String::new(),
            page_sources,
            footer_applied: false,
        }
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    /// Append the page-sources footer. Safe to call more than once.
    pub fn finish(&mut self) {
        if self.footer_applied || self.page_sources.is_empty() {
            return;
        }
        self.footer_applied = true;

        let pages = self
            .page_sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.text.push_str(&format!("\n\n\nPage Sources: [{pages}]"));
    }

    /// The full buffer as currently known.
    pub fn snapshot(&self) -> &str {
        &self.text
    }
}
