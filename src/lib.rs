//! Headless client core for a document-review assistant.
//!
//! Invariant: one job per tab — a new `start` on a tab with a running job
//! cancels the old one first; two streams never interleave into one buffer.
//!
//! # Public API Overview
//! - Drive streaming chat jobs through [`JobController`] over a shared
//!   [`TabRegistry`]; cancellation retains partial output.
//! - Hold a grounded conversation with [`ChatSession`], including the
//!   retrieval-augmentation gate for `@doc1`/`@doc2` references.
//! - Evaluate generated questions per tab with [`EvalWorkspace`].
//! - Collapse rapid keyboard sends with [`Debouncer`].
//!
//! Hosts surface failures through the [`Notifier`] seam; the core never
//! prints and nothing escapes as an unhandled error.

pub mod accumulator;
pub mod augment;
pub mod controller;
pub mod debounce;
pub mod eval;
pub mod job;
pub mod notify;
pub mod registry;
pub mod session;

pub use ollama_api::{ChatMessage, ChatRequest, Role};

pub use crate::accumulator::AnswerAccumulator;
pub use crate::augment::{has_reference_marker, AugmentedPrompt, RetrievalGate};
pub use crate::controller::{JobController, SharedRegistry};
pub use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use crate::eval::{EvalSettings, EvalWorkspace};
pub use crate::job::{Job, JobId, JobStatus};
pub use crate::notify::{Notifier, NullNotifier, Severity};
pub use crate::registry::{RegistryError, Tab, TabRegistry};
pub use crate::session::{debounced_sender, ChatSession, ChatSettings};
