//! The narrow delivery interface the dispatcher depends on.
//!
//! `eventflow-core` never speaks HTTP directly — it depends only on this
//! trait, injected at construction time. `eventflow-sender` provides the
//! real implementation; tests provide fakes.

use eventflow_model::EpochMillis;

/// The outcome of one delivery attempt (including any retry the sender
/// performed internally).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendResult {
    /// Whether the payload was ultimately accepted by the collector.
    pub success: bool,
    /// Whether the failure was unrecoverable: the dispatcher must
    /// transition to `disabled` for the remainder of its lifetime.
    pub must_shut_down: bool,
    /// The server's own clock, if the response carried a parseable
    /// `Date` header.
    pub server_time: Option<EpochMillis>,
}

impl SendResult {
    /// A successful delivery with no server time observed.
    pub fn ok() -> Self {
        Self {
            success: true,
            must_shut_down: false,
            server_time: None,
        }
    }

    /// A recoverable failure: not shutting down, no server time.
    pub fn recoverable_failure() -> Self {
        Self {
            success: false,
            must_shut_down: false,
            server_time: None,
        }
    }

    /// An unrecoverable failure: the pipeline must disable itself.
    pub fn unrecoverable_failure() -> Self {
        Self {
            success: false,
            must_shut_down: true,
            server_time: None,
        }
    }
}

/// Delivers formatted payloads to the collection service.
#[async_trait::async_trait]
pub trait Sender: Send + Sync {
    /// Deliver an analytics payload (a batch of events plus an optional
    /// trailing summary). `count` is the number of top-level elements in
    /// `bytes`, used for logging only.
    async fn send_analytics_events(&self, bytes: Vec<u8>, count: usize) -> SendResult;

    /// Deliver a single diagnostic event.
    async fn send_diagnostic_event(&self, bytes: Vec<u8>) -> SendResult;
}
