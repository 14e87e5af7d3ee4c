use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use review_api::ReviewApiClient;
use tokio::task::JoinHandle;

use crate::controller::{lock_unpoisoned, SharedRegistry};
use crate::job::{Job, JobId};
use crate::notify::{Notifier, Severity};
use crate::registry::{RegistryError, TabRegistry};

pub const DEFAULT_QUESTION_PROMPT: &str = "Generate me specific questions to grade any \
     document responding to that given text. To get a good grade, all the answers to the \
     questions should be yes";

pub const DEFAULT_ANSWER_PROMPT: &str = "Answer the following question by analyzing the \
     content of the text. The answer should not contain any markdown.";

#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    pub model: String,
    pub temperature: f64,
    pub source_count: u32,
    pub question_prompt: String,
    pub answer_prompt: String,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            model: "llama3.1".to_string(),
            temperature: 0.0,
            source_count: 5,
            question_prompt: DEFAULT_QUESTION_PROMPT.to_string(),
            answer_prompt: DEFAULT_ANSWER_PROMPT.to_string(),
        }
    }
}

fn question_number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\d+\.\s*").expect("number pattern is valid"))
}

/// Strip list numbering and blank lines from pasted or generated text.
fn parse_question_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| question_number_regex().replace(line.trim(), "").into_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

fn format_answers(answers: &[(String, String)]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(index, (question, answer))| format!("{}. {}\n{}", index + 1, question, answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tabbed batch-evaluation surface over the review backend.
///
/// Each tab holds one evaluation result; tabs evaluate independently and
/// a batch keeps running after the user switches away from its tab.
pub struct EvalWorkspace {
    api: Arc<ReviewApiClient>,
    registry: SharedRegistry,
    notifier: Arc<dyn Notifier>,
    next_job_id: AtomicU64,
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
    pub settings: EvalSettings,
    last_document: Option<String>,
}

impl EvalWorkspace {
    pub fn new(
        api: Arc<ReviewApiClient>,
        notifier: Arc<dyn Notifier>,
        settings: EvalSettings,
    ) -> Self {
        Self {
            api,
            registry: Arc::new(Mutex::new(TabRegistry::new())),
            notifier,
            next_job_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            settings,
            last_document: None,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn add_tab(&self) -> String {
        lock_unpoisoned(&self.registry).add_tab()
    }

    /// Delete a tab, surfacing the sole-tab precondition as a notice.
    pub fn delete_tab(&self, name: &str) -> bool {
        let result = lock_unpoisoned(&self.registry).delete_tab(name);
        match result {
            Ok(()) => {
                lock_unpoisoned(&self.pending).remove(name);
                true
            }
            Err(RegistryError::LastTab) => {
                self.notifier.notify(
                    Severity::Warning,
                    "Cannot delete all tabs.",
                    "You need at least one tab.",
                );
                false
            }
            Err(RegistryError::UnknownTab(_)) => false,
        }
    }

    pub fn set_active(&self, name: &str) -> Result<(), RegistryError> {
        lock_unpoisoned(&self.registry).set_active(name)
    }

    pub fn active_tab(&self) -> String {
        lock_unpoisoned(&self.registry).active().to_string()
    }

    pub fn answer_text(&self, tab: &str) -> Option<String> {
        lock_unpoisoned(&self.registry)
            .job(tab)
            .map(|job| job.text().to_string())
    }

    /// Ask the backend for grading questions against the last uploaded
    /// document, one per line.
    pub async fn generate_questions(&self) -> Option<String> {
        match self
            .api
            .generate_questions(&self.settings.question_prompt)
            .await
        {
            Ok(questions) => Some(questions.join("\n")),
            Err(error) => {
                tracing::warn!(%error, "question generation failed");
                self.notifier.notify(
                    Severity::Error,
                    "Question Generation Failed",
                    &format!("There was a problem generating questions: {error}"),
                );
                None
            }
        }
    }

    /// Answer every question in `text` against the document and write the
    /// numbered result into the active tab.
    ///
    /// The batch runs in the background; switching tabs or starting a
    /// batch on another tab does not disturb it.
    pub fn evaluate_questions(&self, text: &str) -> Option<JobId> {
        let questions = parse_question_list(text);
        if questions.is_empty() {
            self.notifier.notify(
                Severity::Warning,
                "No questions to evaluate.",
                "Enter or generate at least one question first.",
            );
            return None;
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let tab = {
            let mut registry = lock_unpoisoned(&self.registry);
            let tab = registry.active().to_string();
            let seeded = registry.with_job_mut(&tab, |slot| {
                *slot = Some(Job::running(job_id, Vec::new()));
            });
            if seeded.is_err() {
                return None;
            }
            tab
        };

        let api = Arc::clone(&self.api);
        let registry = Arc::clone(&self.registry);
        let notifier = Arc::clone(&self.notifier);
        let settings = self.settings.clone();
        let task_tab = tab.clone();
        let handle = tokio::spawn(async move {
            let outcome = api
                .answer_questions(
                    &questions,
                    &settings.answer_prompt,
                    settings.temperature,
                    settings.source_count,
                    &settings.model,
                )
                .await;

            let mut registry = lock_unpoisoned(&registry);
            let _ = registry.with_job_mut(&task_tab, |slot| {
                let Some(job) = slot else { return };
                if job.id != job_id {
                    return;
                }
                match &outcome {
                    Ok(answers) => {
                        job.apply_delta(&format_answers(answers));
                        job.complete();
                    }
                    Err(_) => job.mark_failed(),
                }
            });
            if let Err(error) = outcome {
                tracing::warn!(tab = %task_tab, job_id, %error, "evaluation failed");
                notifier.notify(
                    Severity::Error,
                    "Evaluation Failed",
                    &format!("There was a problem answering the questions: {error}"),
                );
            }
        });

        lock_unpoisoned(&self.pending).insert(tab, handle);
        Some(job_id)
    }

    /// Push a document to the review backend, replacing the previous one.
    pub async fn upload_document(&mut self, file_name: &str, bytes: Vec<u8>) -> bool {
        match self.api.ingest_document(file_name, bytes).await {
            Ok(()) => {
                self.last_document = Some(file_name.to_string());
                true
            }
            Err(error) => {
                tracing::warn!(file_name, %error, "document upload failed");
                self.notifier.notify(
                    Severity::Error,
                    "Upload Failed",
                    &format!("There was a problem uploading the document: {error}"),
                );
                false
            }
        }
    }

    pub fn last_document(&self) -> Option<&str> {
        self.last_document.as_deref()
    }

    pub fn reset_document(&mut self) {
        self.last_document = None;
    }

    /// Await the tab's running batch, for headless callers and tests.
    pub async fn join(&self, tab: &str) {
        let handle = lock_unpoisoned(&self.pending).remove(tab);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
