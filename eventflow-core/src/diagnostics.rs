//! Diagnostic-statistics event generation.
//!
//! Optional: a dispatcher constructed without a [`DiagnosticStore`] never
//! builds or sends these events. When present, the dispatcher emits one
//! `diagnostic-init` event at startup and one periodic `diagnostic` event
//! per [`crate::config::EventsConfig::diagnostic_recording_interval`].

use serde_json::{json, Map, Value};

use eventflow_model::EpochMillis;

/// One streaming connection attempt, as reported by the data-source
/// subsystem this crate doesn't own.
#[derive(Debug, Clone, Default)]
pub struct StreamInit {
    /// When the connection attempt started.
    pub timestamp: EpochMillis,
    /// How long the attempt took before succeeding or failing.
    pub duration_millis: u64,
    /// Whether the attempt failed.
    pub failed: bool,
}

impl StreamInit {
    fn to_json(&self) -> Value {
        json!({
            "timestamp": self.timestamp.as_millis(),
            "durationMillis": self.duration_millis,
            "failed": self.failed,
        })
    }
}

/// Stable identity fields included on every diagnostic event.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticContext {
    /// A short, non-identifying suffix of the SDK key.
    pub sdk_key_suffix: String,
    /// A random id generated once per SDK instance.
    pub diagnostic_id: String,
}

impl DiagnosticContext {
    fn to_json(&self) -> Value {
        json!({
            "sdkKeySuffix": self.sdk_key_suffix,
            "diagnosticId": self.diagnostic_id,
        })
    }
}

/// Counters accumulated since the last periodic diagnostic event, reset
/// every time one is built.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSnapshot {
    /// When the current accumulation period started.
    pub data_since_date: EpochMillis,
    /// Events dropped for buffer overflow or delivery backpressure.
    pub dropped_events: u64,
    /// Distinct contexts whose index event was suppressed by
    /// deduplication.
    pub deduplicated_users: u64,
    /// Number of events in the most recently delivered batch.
    pub events_in_last_batch: u64,
    /// Streaming connection attempts observed this period.
    pub stream_inits: Vec<StreamInit>,
}

/// Supplies the stable identity the dispatcher can't generate itself
/// (the SDK key suffix and a process-lifetime random id), plus the
/// descriptive fields carried only once on the startup `diagnostic-init`
/// event. Implementors that don't need real identifiers or descriptive
/// fields can return empty strings/objects.
pub trait DiagnosticStore: Send + Sync {
    /// The identity fields for this SDK instance.
    fn context(&self) -> DiagnosticContext;

    /// The `sdk` field of the startup `diagnostic-init` event (name,
    /// version, wrapper info). Defaults to an empty object.
    fn sdk_info(&self) -> Value {
        Value::Object(Map::new())
    }

    /// The `configuration` field of the startup `diagnostic-init` event
    /// (a sanitized snapshot of the effective configuration, owned by
    /// the SDK facade this crate doesn't). Defaults to an empty object.
    fn configuration_info(&self) -> Value {
        Value::Object(Map::new())
    }

    /// The `platform` field of the startup `diagnostic-init` event.
    /// Defaults to an empty object.
    fn platform_info(&self) -> Value {
        Value::Object(Map::new())
    }
}

/// A diagnostic store that reports empty identity fields. Used when no
/// real `diagnosticStore` is configured, keeping diagnostic emission
/// disabled in practice without making the dispatcher's diagnostic path
/// conditional on an `Option`.
#[derive(Debug, Default)]
pub struct NoopDiagnosticStore;

impl DiagnosticStore for NoopDiagnosticStore {
    fn context(&self) -> DiagnosticContext {
        DiagnosticContext::default()
    }
}

/// Build the one-shot `diagnostic-init` event sent at startup.
pub fn build_init_event(
    ctx: &DiagnosticContext,
    now: EpochMillis,
    sdk: Value,
    configuration: Value,
    platform: Value,
) -> Value {
    let mut obj = Map::new();
    obj.insert("kind".into(), Value::String("diagnostic-init".into()));
    obj.insert("creationDate".into(), Value::Number(now.as_millis().into()));
    obj.insert("id".into(), ctx.to_json());
    obj.insert("sdk".into(), sdk);
    obj.insert("configuration".into(), configuration);
    obj.insert("platform".into(), platform);
    Value::Object(obj)
}

/// Build a periodic `diagnostic` statistics event.
pub fn build_periodic_event(ctx: &DiagnosticContext, now: EpochMillis, snapshot: &DiagnosticSnapshot) -> Value {
    let mut obj = Map::new();
    obj.insert("kind".into(), Value::String("diagnostic".into()));
    obj.insert("creationDate".into(), Value::Number(now.as_millis().into()));
    obj.insert("id".into(), ctx.to_json());
    obj.insert(
        "dataSinceDate".into(),
        Value::Number(snapshot.data_since_date.as_millis().into()),
    );
    obj.insert("droppedEvents".into(), Value::Number(snapshot.dropped_events.into()));
    obj.insert(
        "deduplicatedUsers".into(),
        Value::Number(snapshot.deduplicated_users.into()),
    );
    obj.insert(
        "eventsInLastBatch".into(),
        Value::Number(snapshot.events_in_last_batch.into()),
    );
    obj.insert(
        "streamInits".into(),
        Value::Array(snapshot.stream_inits.iter().map(StreamInit::to_json).collect()),
    );
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_event_has_expected_shape() {
        let ctx = DiagnosticContext {
            sdk_key_suffix: "abcd".into(),
            diagnostic_id: "uuid-1".into(),
        };
        let event = build_init_event(&ctx, 1000.into(), json!({"name": "eventflow"}), json!({}), json!({}));
        assert_eq!(event["kind"], "diagnostic-init");
        assert_eq!(event["id"]["sdkKeySuffix"], "abcd");
        assert_eq!(event["id"]["diagnosticId"], "uuid-1");
    }

    #[test]
    fn periodic_event_includes_counters_and_stream_inits() {
        let ctx = DiagnosticContext::default();
        let snapshot = DiagnosticSnapshot {
            data_since_date: 500.into(),
            dropped_events: 3,
            deduplicated_users: 2,
            events_in_last_batch: 10,
            stream_inits: vec![StreamInit {
                timestamp: 600.into(),
                duration_millis: 50,
                failed: false,
            }],
        };
        let event = build_periodic_event(&ctx, 1000.into(), &snapshot);
        assert_eq!(event["kind"], "diagnostic");
        assert_eq!(event["droppedEvents"], 3);
        assert_eq!(event["deduplicatedUsers"], 2);
        assert_eq!(event["eventsInLastBatch"], 10);
        assert_eq!(event["streamInits"][0]["durationMillis"], 50);
    }

    #[test]
    fn noop_store_has_empty_identity() {
        let ctx = NoopDiagnosticStore.context();
        assert!(ctx.sdk_key_suffix.is_empty());
        assert!(ctx.diagnostic_id.is_empty());
    }
}
