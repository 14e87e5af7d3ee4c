use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Response};

use crate::config::OllamaApiConfig;
use crate::error::{status_message, OllamaApiError};
use crate::events::ChatStreamEvent;
use crate::ndjson::NdjsonStreamParser;
use crate::payload::ChatRequest;
use crate::url::normalize_chat_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct OllamaApiClient {
    http: Client,
    config: OllamaApiConfig,
}

/// Result of draining one chat stream to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub events: Vec<ChatStreamEvent>,
    /// Whether the backend emitted an explicit `done` record. Connection
    /// close without one still counts as normal completion for callers.
    pub saw_done: bool,
}

impl OllamaApiClient {
    pub fn new(config: OllamaApiConfig) -> Result<Self, OllamaApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OllamaApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_request(&self, request: &ChatRequest) -> reqwest::RequestBuilder {
        self.http.post(self.normalized_endpoint()).json(request)
    }

    /// Send the request and return the response once headers arrive.
    ///
    /// Non-2xx statuses are mapped to [`OllamaApiError::Status`]. There is
    /// no automatic retry: a failed send is surfaced and retry is a fresh
    /// user-initiated start.
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, OllamaApiError> {
        if is_cancelled(cancellation) {
            return Err(OllamaApiError::Cancelled);
        }

        let response = await_or_cancel(self.build_request(request).send(), cancellation)
            .await?
            .map_err(OllamaApiError::from)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_default();
        Err(OllamaApiError::Status(status, status_message(status, &body)))
    }

    /// Drive the chunked response, invoking `on_event` for each decoded
    /// record in arrival order.
    ///
    /// Returns whether an explicit `done` record was observed. Once the
    /// cancellation signal is set, in-flight reads unwind and no further
    /// events are delivered.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<bool, OllamaApiError>
    where
        F: FnMut(ChatStreamEvent),
    {
        let response = self.send(request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = NdjsonStreamParser::default();
        let mut saw_done = false;

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(OllamaApiError::Cancelled);
            }
            let chunk = chunk.map_err(OllamaApiError::from)?;
            for event in parser.feed(&chunk) {
                dispatch_event(event, &mut saw_done, &mut on_event);
            }
        }

        for event in parser.finish() {
            dispatch_event(event, &mut saw_done, &mut on_event);
        }

        if is_cancelled(cancellation) {
            return Err(OllamaApiError::Cancelled);
        }

        Ok(saw_done)
    }

    /// Collect the whole stream into one outcome.
    pub async fn stream(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamOutcome, OllamaApiError> {
        let mut events = Vec::new();
        let saw_done = self
            .stream_with_handler(request, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok(StreamOutcome { events, saw_done })
    }
}

fn dispatch_event<F>(event: ChatStreamEvent, saw_done: &mut bool, on_event: &mut F)
where
    F: FnMut(ChatStreamEvent),
{
    match &event {
        ChatStreamEvent::Malformed { raw_line } => {
            tracing::warn!(line = %raw_line, "skipping malformed stream record");
        }
        ChatStreamEvent::Done => {
            *saw_done = true;
        }
        ChatStreamEvent::ContentDelta { .. } => {}
    }

    on_event(event);
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, OllamaApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(OllamaApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(OllamaApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
