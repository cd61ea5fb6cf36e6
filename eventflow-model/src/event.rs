//! The event tagged union.
//!
//! `Event` replaces an inheritance-based event hierarchy with a single sum
//! type discriminated by variant. Every formatting decision is a match on
//! this enum rather than virtual dispatch.

use serde_json::Value;

use crate::context::Context;
use crate::millis::EpochMillis;

/// A single analytics event produced by flag evaluation, identification,
/// or custom instrumentation.
#[derive(Debug, Clone)]
pub enum Event {
    /// A flag evaluation.
    FeatureRequest(FeatureRequestEvent),
    /// An explicit identify call.
    Identify(IdentifyEvent),
    /// A custom application event.
    Custom(CustomEvent),
    /// A synthesized index event, carrying a context's full attributes.
    /// Never created directly by application code — only by the
    /// dispatcher's deduplication logic.
    Index(IndexEvent),
}

impl Event {
    /// The context this event is about, regardless of variant.
    pub fn context(&self) -> &Context {
        match self {
            Event::FeatureRequest(e) => &e.context,
            Event::Identify(e) => &e.context,
            Event::Custom(e) => &e.context,
            Event::Index(e) => &e.context,
        }
    }

    /// The creation timestamp, regardless of variant.
    pub fn creation_date(&self) -> EpochMillis {
        match self {
            Event::FeatureRequest(e) => e.creation_date,
            Event::Identify(e) => e.creation_date,
            Event::Custom(e) => e.creation_date,
            Event::Index(e) => e.creation_date,
        }
    }
}

/// A flag evaluation event.
#[derive(Debug, Clone)]
pub struct FeatureRequestEvent {
    /// When the evaluation happened.
    pub creation_date: EpochMillis,
    /// The flag key that was evaluated.
    pub flag_key: String,
    /// The context the flag was evaluated against.
    pub context: Context,
    /// The flag's version at evaluation time, or `-1` if unknown.
    pub flag_version: i64,
    /// The variation index that was served, or `-1` if none (e.g. the
    /// flag was unknown and the default value was served).
    pub variation: i64,
    /// The value that was served.
    pub value: Value,
    /// The value that would have been served had evaluation failed.
    pub default_value: Value,
    /// Optional evaluation reason (the evaluation engine's diagnostic
    /// explanation of why this variation was chosen).
    pub reason: Option<Value>,
    /// If this evaluation happened as a prerequisite check for another
    /// flag, that flag's key.
    pub prerequisite_of_flag_key: Option<String>,
    /// Whether this evaluation should be tracked as a full event (as
    /// opposed to being folded into the summary only).
    pub track_events: bool,
    /// If set and still in the future relative to both the local clock
    /// and the last known server time, a debug copy of this event is
    /// also emitted.
    pub debug_events_until_date: Option<EpochMillis>,
    /// Whether this is the debug copy of a feature request (inlines the
    /// full context rather than `contextKeys`).
    pub debug: bool,
}

/// An explicit identify event.
#[derive(Debug, Clone)]
pub struct IdentifyEvent {
    /// When the identify call happened.
    pub creation_date: EpochMillis,
    /// The context being identified.
    pub context: Context,
}

/// A custom application event.
#[derive(Debug, Clone)]
pub struct CustomEvent {
    /// When the custom event happened.
    pub creation_date: EpochMillis,
    /// The application-defined event key.
    pub event_key: String,
    /// The context the event is about.
    pub context: Context,
    /// Optional arbitrary event data.
    pub data: Option<Value>,
    /// Optional numeric metric value (e.g. for revenue tracking).
    pub metric_value: Option<f64>,
}

/// A synthesized index event. Only ever produced by the dispatcher's
/// context-deduplication logic, never directly by application code.
#[derive(Debug, Clone)]
pub struct IndexEvent {
    /// When the index event was synthesized (copies the triggering
    /// event's creation date).
    pub creation_date: EpochMillis,
    /// The context being indexed.
    pub context: Context,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SingleContext;

    fn ctx() -> Context {
        Context::single(SingleContext::new("user", "u1"))
    }

    #[test]
    fn context_accessor_covers_every_variant() {
        let events = vec![
            Event::FeatureRequest(FeatureRequestEvent {
                creation_date: 1.into(),
                flag_key: "f".into(),
                context: ctx(),
                flag_version: 1,
                variation: 0,
                value: Value::Bool(true),
                default_value: Value::Bool(false),
                reason: None,
                prerequisite_of_flag_key: None,
                track_events: true,
                debug_events_until_date: None,
                debug: false,
            }),
            Event::Identify(IdentifyEvent {
                creation_date: 1.into(),
                context: ctx(),
            }),
            Event::Custom(CustomEvent {
                creation_date: 1.into(),
                event_key: "purchase".into(),
                context: ctx(),
                data: None,
                metric_value: None,
            }),
            Event::Index(IndexEvent {
                creation_date: 1.into(),
                context: ctx(),
            }),
        ];
        for event in events {
            assert_eq!(event.context().dedup_key(), "user:u1");
            assert_eq!(event.creation_date().as_millis(), 1);
        }
    }
}
