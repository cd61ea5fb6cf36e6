//! The summarization engine.
//!
//! Owns exactly one [`Summary`] at a time: `summarize` folds an
//! evaluation in, `snapshot_and_reset` hands the current summary to a
//! delivery worker and starts a fresh one, and `restore` lets a failed
//! delivery path put an unsent summary back without inventing a merge
//! strategy the sources never specify (see the restore note in
//! `DESIGN.md`).

use serde_json::Value;

use eventflow_model::{EpochMillis, Summary};

/// Single-owner aggregator for evaluation counters.
#[derive(Debug, Default)]
pub struct Summarizer {
    current: Summary,
}

impl Summarizer {
    /// A fresh summarizer with an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one evaluation into the current summary.
    #[allow(clippy::too_many_arguments)]
    pub fn summarize(
        &mut self,
        timestamp: EpochMillis,
        flag_key: &str,
        flag_version: i64,
        variation: i64,
        value: &Value,
        default_value: &Value,
        context_kinds: impl IntoIterator<Item = String>,
    ) {
        self.current.increment(
            timestamp,
            flag_key,
            flag_version,
            variation,
            value,
            default_value,
            context_kinds,
        );
    }

    /// Take the current summary and replace it with a fresh, empty one.
    pub fn snapshot_and_reset(&mut self) -> Summary {
        std::mem::take(&mut self.current)
    }

    /// Replace the current summary with a previously snapshotted one,
    /// discarding whatever has accumulated since. Used by a delivery
    /// worker that wants to retry sending a summary it couldn't deliver.
    pub fn restore(&mut self, previous: Summary) {
        self.current = previous;
    }
}
