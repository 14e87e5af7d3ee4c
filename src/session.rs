use std::sync::{Arc, Mutex};

use ollama_api::{ChatMessage, ChatRequest, OllamaApiClient};
use review_api::ReviewApiClient;

use crate::augment::RetrievalGate;
use crate::controller::{lock_unpoisoned, JobController, SharedRegistry};
use crate::debounce::Debouncer;
use crate::job::JobId;
use crate::notify::Notifier;
use crate::registry::TabRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f64,
    pub source_count: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "llama3.1".to_string(),
            temperature: 0.0,
            source_count: 5,
        }
    }
}

/// A single streaming conversation with optional document retrieval.
///
/// The transcript keeps the user's original text, reference markers
/// included; augmentation only rewrites the copy sent over the wire.
/// Sending while a reply is still streaming cancels it, keeps whatever
/// text arrived as that turn's answer, and starts the new request.
pub struct ChatSession {
    controller: Arc<JobController>,
    gate: RetrievalGate,
    tab: String,
    messages: Vec<ChatMessage>,
    pub settings: ChatSettings,
}

impl ChatSession {
    pub fn new(
        client: Arc<OllamaApiClient>,
        review: Arc<ReviewApiClient>,
        notifier: Arc<dyn Notifier>,
        settings: ChatSettings,
    ) -> Self {
        let registry: SharedRegistry = Arc::new(Mutex::new(TabRegistry::new()));
        let tab = lock_unpoisoned(&registry).active().to_string();
        Self {
            controller: JobController::new(registry, client, notifier),
            gate: RetrievalGate::new(review),
            tab,
            messages: Vec::new(),
            settings,
        }
    }

    /// Dispatch a user message. Blank input is ignored. Returns the id of
    /// the job now streaming the reply, or `None` when nothing was sent.
    pub async fn send(&mut self, input: &str) -> Option<JobId> {
        let message = input.trim();
        if message.is_empty() {
            return None;
        }

        self.fold_finished_answer();
        self.messages.push(ChatMessage::user(message));

        let augmented = self.gate.prepare(message, self.settings.source_count).await;
        let mut outgoing = self.messages.clone();
        if let Some(last) = outgoing.last_mut() {
            last.content = augmented.content;
        }

        let request = ChatRequest::new(&self.settings.model, outgoing, self.settings.temperature);
        self.controller
            .start(&self.tab, request, augmented.page_sources)
            .ok()
    }

    /// Full conversation view: settled turns plus the live answer.
    pub fn transcript(&self) -> Vec<ChatMessage> {
        let mut transcript = self.messages.clone();
        let registry = lock_unpoisoned(self.controller.registry());
        if let Some(job) = registry.job(&self.tab) {
            if !job.text().is_empty() || !job.status().is_terminal() {
                transcript.push(ChatMessage::assistant(job.text()));
            }
        }
        transcript
    }

    pub fn stop(&self) {
        self.controller.cancel(&self.tab);
    }

    pub fn is_streaming(&self) -> bool {
        self.controller.is_running(&self.tab)
    }

    /// Drop the transcript and any finished answer; in-flight work is
    /// cancelled first.
    pub fn reset(&mut self) {
        self.stop();
        self.messages.clear();
        let mut registry = lock_unpoisoned(self.controller.registry());
        let _ = registry.with_job_mut(&self.tab, |slot| *slot = None);
    }

    /// Await the in-flight reply, for headless callers and tests.
    pub async fn join(&self) {
        self.controller.join(&self.tab).await;
    }

    // Move the previous job's terminal answer into the settled transcript
    // before the next turn reuses the slot.
    fn fold_finished_answer(&mut self) {
        let answer = {
            let mut registry = lock_unpoisoned(self.controller.registry());
            registry
                .with_job_mut(&self.tab, |slot| {
                    slot.take().map(|job| job.text().to_string())
                })
                .ok()
                .flatten()
        };

        if let Some(answer) = answer {
            if !answer.is_empty() {
                self.messages.push(ChatMessage::assistant(&answer));
            }
        }
    }
}

/// Wire a session behind a trailing-edge debouncer, for keyboard-driven
/// hosts where Enter may fire in quick bursts.
pub fn debounced_sender(session: Arc<tokio::sync::Mutex<ChatSession>>) -> Debouncer<String> {
    Debouncer::new(move |text: String| {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            session.lock().await.send(&text).await;
        });
    })
}
