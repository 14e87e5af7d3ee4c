//! REST client for the review backend.
//!
//! Covers the non-streaming endpoints: question generation, batch
//! question answering, document retrieval for prompt augmentation, and
//! reviewer-PDF ingestion. Streaming chat lives in `ollama_api`.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::ReviewApiClient;
pub use config::ReviewApiConfig;
pub use error::ReviewApiError;
pub use types::RetrievalResult;
