//! Diagnostics sink for protocol traffic and fetched feed items.
//!
//! Components receive an `Arc<dyn Diagnostics>` at construction instead of
//! writing to a process-wide logger, so what a session or poller observed can
//! be inspected in isolation.

use std::sync::{Arc, Mutex, PoisonError};

use crate::feed::FeedItem;

/// Records what the relay saw on the wire and from the feed.
///
/// Events are recorded at the point they are observed, whether or not the
/// surrounding operation ends up succeeding.
pub trait Diagnostics: Send + Sync {
    /// A line is about to be written to the IRC socket.
    fn line_sent(&self, line: &str);

    /// A line was read from the IRC socket.
    fn line_received(&self, line: &str);

    /// An item was fetched from the feed, before delivery filtering.
    fn item_fetched(&self, account: &str, item: &FeedItem);

    /// A fetch attempt hit transient upstream unavailability.
    fn upstream_unavailable(&self, account: &str, attempt: u32);

    /// A fetch attempt failed with a non-transient error.
    fn upstream_failed(&self, account: &str, error: &str);
}

/// Default sink: emits every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    /// Returns the sink behind a shared handle, ready to inject.
    #[must_use]
    pub fn shared() -> Arc<dyn Diagnostics> {
        Arc::new(Self)
    }
}

impl Diagnostics for TracingDiagnostics {
    fn line_sent(&self, line: &str) {
        tracing::debug!("IRC >> {line}");
    }

    fn line_received(&self, line: &str) {
        tracing::debug!("IRC << {line}");
    }

    fn item_fetched(&self, account: &str, item: &FeedItem) {
        tracing::info!(account = %account, id = item.id, text = %item.text, "New feed item");
    }

    fn upstream_unavailable(&self, account: &str, attempt: u32) {
        tracing::error!(account = %account, attempt, "Feed upstream unavailable");
    }

    fn upstream_failed(&self, account: &str, error: &str) {
        tracing::error!(account = %account, error = %error, "Feed upstream error");
    }
}

/// A single recorded diagnostics event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    Sent(String),
    Received(String),
    Fetched { id: u64, text: String },
    Unavailable { attempt: u32 },
    Failed(String),
}

/// Sink that keeps every event in memory, in observation order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns only the lines written to the socket.
    #[must_use]
    pub fn sent_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DiagnosticEvent::Sent(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn line_sent(&self, line: &str) {
        self.push(DiagnosticEvent::Sent(line.to_string()));
    }

    fn line_received(&self, line: &str) {
        self.push(DiagnosticEvent::Received(line.to_string()));
    }

    fn item_fetched(&self, _account: &str, item: &FeedItem) {
        self.push(DiagnosticEvent::Fetched {
            id: item.id,
            text: item.text.clone(),
        });
    }

    fn upstream_unavailable(&self, _account: &str, attempt: u32) {
        self.push(DiagnosticEvent::Unavailable { attempt });
    }

    fn upstream_failed(&self, _account: &str, error: &str) {
        self.push(DiagnosticEvent::Failed(error.to_string()));
    }
}
