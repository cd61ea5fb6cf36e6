//! Error classification for analytics delivery.
//!
//! The collector's HTTP responses are classified into three buckets: a
//! single retry is worth attempting, the pipeline must disable itself
//! permanently, or — not an HTTP response at all — a network/IO failure,
//! which is treated the same as a recoverable status.

use thiserror::Error;

/// Errors raised while attempting to deliver a payload.
///
/// None of these ever reach the dispatcher as a `Result::Err` — the
/// sender always reduces them to a [`eventflow_core::SendResult`]. This
/// type exists for the sender's own internal bookkeeping and for
/// constructing informative log messages.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SendError {
    /// The request could not be sent at all (DNS, connect, TLS, timeout).
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// The collector responded with a status outside the recoverable set
    /// (401, 403, or any other 4xx besides 400/408/429).
    #[error("unrecoverable response: HTTP {status}")]
    Unrecoverable {
        /// The HTTP status code returned.
        status: u16,
    },

    /// The collector responded with a status worth retrying once (400,
    /// 408, 429, or any 5xx).
    #[error("recoverable response: HTTP {status}")]
    Recoverable {
        /// The HTTP status code returned.
        status: u16,
    },

    /// Catch-all for errors outside the above, surfaced for logging only.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// How a response status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The request succeeded.
    Success,
    /// Worth a single retry.
    Recoverable,
    /// Never retry; disable the pipeline.
    Unrecoverable,
}

/// Classify an HTTP status code per the delivery contract: 2xx is
/// success; 400, 408, 429, and every 5xx are recoverable; 401 and 403 and
/// every other 4xx are unrecoverable.
pub fn classify_status(status: u16) -> Classification {
    if (200..300).contains(&status) {
        return Classification::Success;
    }
    match status {
        400 | 408 | 429 => Classification::Recoverable,
        401 | 403 => Classification::Unrecoverable,
        500..=599 => Classification::Recoverable,
        _ => Classification::Unrecoverable,
    }
}

/// Classify a transport-level failure (no HTTP response at all) as
/// recoverable — the same treatment as a 5xx, since it's usually
/// transient.
pub fn classify_transport_error(_err: &reqwest::Error) -> Classification {
    Classification::Recoverable
}
