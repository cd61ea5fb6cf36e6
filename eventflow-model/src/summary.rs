//! Aggregated evaluation counters.
//!
//! A [`Summary`] folds every `FeatureRequest` evaluation seen in a time
//! window into per-flag counters keyed by (flag version, variation),
//! rather than keeping one full event per evaluation. This is the
//! mechanism that lets high-volume flag evaluation stay cheap: the
//! summarizer owns exactly one `Summary` at a time and hands it off to a
//! delivery worker on flush.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::millis::EpochMillis;

/// A single (version, variation) counter: how many times this exact
/// combination was observed, and the value that was served.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationCounter {
    /// The variation index, or `-1` if the flag was unknown.
    pub variation: i64,
    /// The number of times this (version, variation) pair was observed.
    pub count: u64,
    /// The value that was served for this variation.
    pub value: Value,
}

/// Counters for every variation observed at a single flag version.
///
/// Kept as a flat ordered list rather than a hash map: the cardinality of
/// variations per flag version is small (single digits in virtually every
/// real flag), so linear scan-and-insert beats hashing overhead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionCounters {
    counters: Vec<VariationCounter>,
}

impl VersionCounters {
    fn increment(&mut self, variation: i64, value: &Value) {
        if let Some(existing) = self.counters.iter_mut().find(|c| c.variation == variation) {
            existing.count += 1;
        } else {
            self.counters.push(VariationCounter {
                variation,
                count: 1,
                value: value.clone(),
            });
        }
    }

    /// The counters for this version, in first-observed order.
    pub fn counters(&self) -> &[VariationCounter] {
        &self.counters
    }
}

/// Per-flag aggregation: the default value served on unknown-flag
/// evaluations, every context kind an evaluation was observed against,
/// and counters broken down by flag version.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagInfo {
    /// The default value passed by the caller for this flag key. The
    /// last-observed default wins if it somehow varies across calls.
    pub default_value: Value,
    /// Counters keyed by flag version (`-1` for unknown-flag evaluations),
    /// kept as a flat ordered list for the same reason as
    /// [`VersionCounters`].
    versions: Vec<(i64, VersionCounters)>,
    /// Every context kind an evaluation against this flag was observed
    /// with.
    pub context_kinds: BTreeSet<String>,
}

impl FlagInfo {
    fn new(default_value: Value) -> Self {
        Self {
            default_value,
            versions: Vec::new(),
            context_kinds: BTreeSet::new(),
        }
    }

    fn version_mut(&mut self, version: i64) -> &mut VersionCounters {
        if let Some(idx) = self.versions.iter().position(|(v, _)| *v == version) {
            &mut self.versions[idx].1
        } else {
            self.versions.push((version, VersionCounters::default()));
            &mut self.versions.last_mut().unwrap().1
        }
    }

    /// Counters by flag version, in first-observed order.
    pub fn versions(&self) -> &[(i64, VersionCounters)] {
        &self.versions
    }
}

/// Aggregated evaluation counters for every flag evaluated in a time
/// window, plus the window's own bounds.
///
/// `startDate`/`endDate` are `None` until the first event is folded in;
/// once set, `startDate <= endDate` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    start_date: Option<EpochMillis>,
    end_date: Option<EpochMillis>,
    /// Counters keyed by flag key, in first-observed order.
    counters: Vec<(String, FlagInfo)>,
}

impl Summary {
    /// An empty summary with no counters and no time window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any evaluation has been folded into this summary.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// The earliest timestamp folded in, if any.
    pub fn start_date(&self) -> Option<EpochMillis> {
        self.start_date
    }

    /// The latest timestamp folded in, if any.
    pub fn end_date(&self) -> Option<EpochMillis> {
        self.end_date
    }

    /// Counters by flag key, in first-observed order.
    pub fn counters(&self) -> &[(String, FlagInfo)] {
        &self.counters
    }

    /// Fold one evaluation into the summary, creating the flag's entry if
    /// this is the first time it's been seen.
    ///
    /// Unknown-flag evaluations use `flag_version = -1, variation = -1`
    /// and `value` equal to `default_value`.
    pub fn increment(
        &mut self,
        timestamp: EpochMillis,
        flag_key: &str,
        flag_version: i64,
        variation: i64,
        value: &Value,
        default_value: &Value,
        context_kinds: impl IntoIterator<Item = String>,
    ) {
        self.start_date = Some(match self.start_date {
            Some(existing) => existing.min(timestamp),
            None => timestamp,
        });
        self.end_date = Some(match self.end_date {
            Some(existing) => existing.max(timestamp),
            None => timestamp,
        });

        let flag = if let Some(idx) = self.counters.iter().position(|(k, _)| k == flag_key) {
            &mut self.counters[idx].1
        } else {
            self.counters
                .push((flag_key.to_string(), FlagInfo::new(default_value.clone())));
            &mut self.counters.last_mut().unwrap().1
        };
        flag.default_value = default_value.clone();
        flag.context_kinds.extend(context_kinds);
        flag.version_mut(flag_version).increment(variation, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_summary_has_no_window() {
        let s = Summary::new();
        assert!(s.is_empty());
        assert_eq!(s.start_date(), None);
        assert_eq!(s.end_date(), None);
    }

    #[test]
    fn increment_tracks_start_and_end_date() {
        let mut s = Summary::new();
        s.increment(
            1000.into(),
            "f1",
            11,
            1,
            &json!("v1"),
            &json!("d1"),
            vec!["user".to_string()],
        );
        s.increment(
            2000.into(),
            "f2",
            22,
            2,
            &json!("v2"),
            &json!("d2"),
            vec!["user".to_string()],
        );
        assert_eq!(s.start_date(), Some(1000.into()));
        assert_eq!(s.end_date(), Some(2000.into()));
    }

    #[test]
    fn repeated_increment_aggregates_same_variation() {
        let mut s = Summary::new();
        for _ in 0..2 {
            s.increment(
                1000.into(),
                "f1",
                11,
                1,
                &json!("v1"),
                &json!("d1"),
                vec!["user".to_string()],
            );
        }
        s.increment(
            1000.into(),
            "f1",
            11,
            2,
            &json!("v2"),
            &json!("d1"),
            vec!["user".to_string()],
        );

        let (_, info) = &s.counters()[0];
        let (_, version_counters) = info
            .versions()
            .iter()
            .find(|(v, _)| *v == 11)
            .expect("version 11 present");
        let c1 = version_counters
            .counters()
            .iter()
            .find(|c| c.variation == 1)
            .unwrap();
        assert_eq!(c1.count, 2);
        let c2 = version_counters
            .counters()
            .iter()
            .find(|c| c.variation == 2)
            .unwrap();
        assert_eq!(c2.count, 1);
    }

    #[test]
    fn unknown_flag_uses_negative_one_sentinels() {
        let mut s = Summary::new();
        s.increment(
            1000.into(),
            "missing",
            -1,
            -1,
            &json!("d"),
            &json!("d"),
            vec!["user".to_string()],
        );
        let (_, info) = &s.counters()[0];
        assert_eq!(info.versions()[0].0, -1);
        assert_eq!(info.versions()[0].1.counters()[0].variation, -1);
    }

    #[test]
    fn context_kinds_accumulate_across_increments() {
        let mut s = Summary::new();
        s.increment(
            1000.into(),
            "f1",
            1,
            0,
            &json!(true),
            &json!(false),
            vec!["user".to_string()],
        );
        s.increment(
            1000.into(),
            "f1",
            1,
            0,
            &json!(true),
            &json!(false),
            vec!["org".to_string()],
        );
        let (_, info) = &s.counters()[0];
        assert_eq!(info.context_kinds.len(), 2);
    }
}
