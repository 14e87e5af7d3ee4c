use crate::accumulator::AnswerAccumulator;

/// Identifier for one job. Monotonically increasing per controller.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One in-flight or finished request tied to a tab.
///
/// Owned exclusively by the tab that spawned it; destroyed when that tab
/// is deleted or a new job supersedes it. Terminal states keep the text
/// accumulated so far — cancellation never clears a partial answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    status: JobStatus,
    answer: AnswerAccumulator,
}

impl Job {
    pub fn running(id: JobId, page_sources: Vec<u32>) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            answer: AnswerAccumulator::new(page_sources),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn text(&self) -> &str {
        self.answer.snapshot()
    }

    pub(crate) fn apply_delta(&mut self, text: &str) {
        if self.status == JobStatus::Running {
            self.answer.push_delta(text);
        }
    }

    /// Terminal success. Idempotent: repeated completion signals neither
    /// duplicate the footer nor resurrect a cancelled or failed job.
    pub(crate) fn complete(&mut self) {
        match self.status {
            JobStatus::Running => {
                self.answer.finish();
                self.status = JobStatus::Completed;
            }
            JobStatus::Completed => self.answer.finish(),
            JobStatus::Cancelled | JobStatus::Failed => {}
        }
    }

    pub(crate) fn mark_cancelled(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Cancelled;
        }
    }

    pub(crate) fn mark_failed(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Failed;
        }
    }
}
