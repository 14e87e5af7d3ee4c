#![allow(dead_code)] // not every test binary uses every helper

use std::sync::{Arc, Mutex};

use docreview::{Notifier, Severity};
use ollama_api::{OllamaApiClient, OllamaApiConfig};
use review_api::{ReviewApiClient, ReviewApiConfig};

/// Notifier that records every notification for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(Severity, String, String)>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .expect("notifier lock")
            .iter()
            .map(|(_, title, _)| title.clone())
            .collect()
    }

    pub fn notices(&self) -> Vec<(Severity, String, String)> {
        self.notices.lock().expect("notifier lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, title: &str, detail: &str) {
        self.notices
            .lock()
            .expect("notifier lock")
            .push((severity, title.to_string(), detail.to_string()));
    }
}

pub fn chat_client(base_url: &str) -> Arc<OllamaApiClient> {
    Arc::new(
        OllamaApiClient::new(OllamaApiConfig::new().with_base_url(base_url))
            .expect("chat client builds"),
    )
}

pub fn review_client(base_url: &str) -> Arc<ReviewApiClient> {
    Arc::new(
        ReviewApiClient::new(ReviewApiConfig::new().with_base_url(base_url))
            .expect("review client builds"),
    )
}

pub fn ndjson_reply(deltas: &[&str], done: bool) -> String {
    let mut body = String::new();
    for delta in deltas {
        body.push_str(&format!(
            "{}\n",
            serde_json::json!({ "message": { "content": delta } })
        ));
    }
    if done {
        body.push_str("{\"done\":true}\n");
    }
    body
}
