use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ollama_api::{
    CancellationSignal, ChatRequest, ChatStreamEvent, OllamaApiClient, OllamaApiError,
};
use tokio::task::JoinHandle;

use crate::job::{Job, JobId};
use crate::notify::{Notifier, Severity};
use crate::registry::{RegistryError, TabRegistry};

/// Registry handle shared between the controller, its workers, and hosts.
pub type SharedRegistry = Arc<Mutex<TabRegistry>>;

struct ActiveJob {
    job_id: JobId,
    cancel: CancellationSignal,
    join_handle: Option<JoinHandle<()>>,
}

/// Owns the lifecycle of streaming jobs: start, cancel, completion,
/// failure. At most one job per tab runs at a time; starting a new job on
/// a tab cancels the one still streaming into it (last-request-wins).
///
/// Every event is applied through the registry's own operations under its
/// lock, re-reading the latest job state — callbacks racing to update the
/// same tab cannot lose updates to a stale copy. Application is guarded
/// by job id and the cancel flag, so a delta racing a cancellation or a
/// superseding start is dropped, never misfiled.
pub struct JobController {
    registry: SharedRegistry,
    client: Arc<OllamaApiClient>,
    notifier: Arc<dyn Notifier>,
    next_job_id: AtomicU64,
    active_jobs: Mutex<HashMap<String, ActiveJob>>,
}

impl JobController {
    pub fn new(
        registry: SharedRegistry,
        client: Arc<OllamaApiClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            client,
            notifier,
            next_job_id: AtomicU64::new(1),
            active_jobs: Mutex::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Open the stream and return immediately with the job running.
    ///
    /// The decode/accumulate loop is driven asynchronously until `done`,
    /// connection close, cancellation, or transport failure.
    pub fn start(
        self: &Arc<Self>,
        tab: &str,
        request: ChatRequest,
        page_sources: Vec<u32>,
    ) -> Result<JobId, RegistryError> {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let cancel: CancellationSignal = Arc::new(AtomicBool::new(false));

        {
            let mut active_jobs = lock_unpoisoned(&self.active_jobs);
            if let Some(previous) = active_jobs.remove(tab) {
                previous.cancel.store(true, Ordering::Release);
            }
        }

        {
            let mut registry = lock_unpoisoned(&self.registry);
            registry.with_job_mut(tab, |slot| {
                *slot = Some(Job::running(job_id, page_sources));
            })?;
        }

        let join_handle = self.spawn_worker(tab.to_string(), job_id, request, Arc::clone(&cancel));
        lock_unpoisoned(&self.active_jobs).insert(
            tab.to_string(),
            ActiveJob {
                job_id,
                cancel,
                join_handle: Some(join_handle),
            },
        );

        tracing::debug!(tab, job_id, "job started");
        Ok(job_id)
    }

    /// Signal the tab's in-flight transport to abort. Accumulated text is
    /// retained; no further updates are produced for the job.
    pub fn cancel(&self, tab: &str) {
        let active_jobs = lock_unpoisoned(&self.active_jobs);
        if let Some(active) = active_jobs.get(tab) {
            active.cancel.store(true, Ordering::Release);
            tracing::debug!(tab, job_id = active.job_id, "job cancellation requested");
        }
    }

    pub fn is_running(&self, tab: &str) -> bool {
        lock_unpoisoned(&self.registry)
            .job(tab)
            .is_some_and(|job| !job.status().is_terminal())
    }

    /// Cancel any job on the tab and remove it from the registry.
    pub fn remove_tab(&self, tab: &str) -> Result<(), RegistryError> {
        self.cancel(tab);
        lock_unpoisoned(&self.registry).delete_tab(tab)?;
        lock_unpoisoned(&self.active_jobs).remove(tab);
        Ok(())
    }

    /// Await the tab's in-flight worker, for headless callers and tests.
    pub async fn join(&self, tab: &str) {
        let join_handle = {
            let mut active_jobs = lock_unpoisoned(&self.active_jobs);
            active_jobs
                .get_mut(tab)
                .and_then(|active| active.join_handle.take())
        };

        if let Some(join_handle) = join_handle {
            let _ = join_handle.await;
        }
    }

    fn spawn_worker(
        self: &Arc<Self>,
        tab: String,
        job_id: JobId,
        request: ChatRequest,
        cancel: CancellationSignal,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.run_job(tab, job_id, request, cancel).await })
    }

    async fn run_job(
        self: Arc<Self>,
        tab: String,
        job_id: JobId,
        request: ChatRequest,
        cancel: CancellationSignal,
    ) {
        let outcome = self
            .client
            .stream_with_handler(&request, Some(&cancel), |event| match event {
                ChatStreamEvent::ContentDelta { text } => {
                    self.apply_delta(&tab, job_id, &cancel, &text);
                }
                ChatStreamEvent::Done => self.apply_completion(&tab, job_id, &cancel),
                ChatStreamEvent::Malformed { .. } => {}
            })
            .await;

        match outcome {
            // Connection close without an explicit done record still
            // completes the job; apply_completion is idempotent.
            Ok(_) => self.apply_completion(&tab, job_id, &cancel),
            Err(OllamaApiError::Cancelled) => {
                self.apply_job(&tab, job_id, Job::mark_cancelled);
                tracing::debug!(tab, job_id, "job cancelled");
            }
            Err(error) => {
                self.apply_job(&tab, job_id, Job::mark_failed);
                tracing::warn!(tab, job_id, %error, "job failed");
                self.notifier.notify(
                    Severity::Error,
                    "Message Failed",
                    &format!("There was a problem with sending your message: {error}"),
                );
            }
        }

        self.clear_active_job_if_matching(&tab, job_id);
    }

    fn apply_delta(&self, tab: &str, job_id: JobId, cancel: &CancellationSignal, text: &str) {
        if cancel.load(Ordering::Acquire) {
            return;
        }

        let mut registry = lock_unpoisoned(&self.registry);
        let _ = registry.with_job_mut(tab, |slot| {
            if let Some(job) = slot {
                if job.id == job_id {
                    job.apply_delta(text);
                }
            }
        });
    }

    // Completion observes the cancel flag too: a done record racing a
    // cancellation must not flip the job to Completed.
    fn apply_completion(&self, tab: &str, job_id: JobId, cancel: &CancellationSignal) {
        if cancel.load(Ordering::Acquire) {
            return;
        }
        self.apply_job(tab, job_id, Job::complete);
    }

    fn apply_job(&self, tab: &str, job_id: JobId, apply: fn(&mut Job)) {
        let mut registry = lock_unpoisoned(&self.registry);
        // The tab may have been deleted or the job superseded; both drop
        // the update silently.
        let _ = registry.with_job_mut(tab, |slot| {
            if let Some(job) = slot {
                if job.id == job_id {
                    apply(job);
                }
            }
        });
    }

    fn clear_active_job_if_matching(&self, tab: &str, job_id: JobId) {
        let mut active_jobs = lock_unpoisoned(&self.active_jobs);
        if active_jobs.get(tab).map(|active| active.job_id) == Some(job_id) {
            active_jobs.remove(tab);
        }
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
