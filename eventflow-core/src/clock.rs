//! Clock abstraction for debug-event expiry checks.
//!
//! The dispatcher must compare `debugEventsUntilDate` against both the
//! local clock and the most recently observed server time. Injecting the
//! clock (rather than calling `SystemTime::now()` directly) keeps the
//! debug-expiry scenarios in the dispatcher's test suite deterministic.

use std::time::{SystemTime, UNIX_EPOCH};

use eventflow_model::EpochMillis;

/// A source of the current wall-clock time, in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> EpochMillis;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> EpochMillis {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        EpochMillis::from_millis(millis)
    }
}
