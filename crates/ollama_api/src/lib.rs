//! Transport-only streaming chat client for the local LLM proxy.
//!
//! This crate owns request building and chunked-response decoding for the
//! `/callollama` endpoint only. It contains no session state and no UI
//! coupling: callers receive typed [`ChatStreamEvent`]s in arrival order
//! and decide what to accumulate.
//!
//! Responses are newline-delimited JSON records. The decoder retains a
//! trailing partial line across chunk boundaries, since backend chunk
//! boundaries are not guaranteed to align with record boundaries.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod ndjson;
pub mod payload;
pub mod url;

pub use client::{CancellationSignal, OllamaApiClient, StreamOutcome};
pub use config::OllamaApiConfig;
pub use error::OllamaApiError;
pub use events::ChatStreamEvent;
pub use ndjson::NdjsonStreamParser;
pub use payload::{ChatMessage, ChatOptions, ChatRequest, Role};
pub use url::normalize_chat_url;
