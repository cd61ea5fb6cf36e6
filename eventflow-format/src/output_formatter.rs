//! Wire-format serialization of a batch of events plus a trailing summary.

use serde_json::{Map, Value};

use eventflow_model::{Context, Event, Summary};

use crate::context_formatter::{format_context, RedactionPolicy};

/// The result of formatting an output payload: the JSON array body and
/// the number of top-level elements it contains (events plus, if
/// present, the trailing summary).
pub struct FormattedOutput {
    /// The JSON array ready to serialize as the request body.
    pub body: Value,
    /// Number of elements in `body`, used for the
    /// `X-LaunchDarkly-Event-Schema`-adjacent event-count bookkeeping and
    /// logging.
    pub count: usize,
}

/// Format a batch of buffered events plus an optional summary into the
/// collector's wire JSON array.
///
/// Events with an invalid or missing context are skipped and do not
/// count toward `count`. A summary with no counters contributes nothing.
pub fn format_output(events: &[Event], summary: &Summary, policy: &RedactionPolicy<'_>) -> FormattedOutput {
    let mut out = Vec::with_capacity(events.len() + 1);

    for event in events {
        if !event.context().is_valid() {
            continue;
        }
        out.push(format_event(event, policy));
    }

    if !summary.is_empty() {
        out.push(format_summary(summary));
    }

    let count = out.len();
    FormattedOutput {
        body: Value::Array(out),
        count,
    }
}

fn context_keys(context: &Context) -> Value {
    let mut out = Map::new();
    for single in context.kinds() {
        out.insert(single.kind.clone(), Value::String(single.key.clone()));
    }
    Value::Object(out)
}

fn format_event(event: &Event, policy: &RedactionPolicy<'_>) -> Value {
    match event {
        Event::FeatureRequest(e) => {
            let mut obj = Map::new();
            obj.insert(
                "kind".into(),
                Value::String(if e.debug { "debug".into() } else { "feature".into() }),
            );
            obj.insert("creationDate".into(), Value::Number(e.creation_date.as_millis().into()));
            obj.insert("key".into(), Value::String(e.flag_key.clone()));
            if e.flag_version >= 0 {
                obj.insert("version".into(), Value::Number(e.flag_version.into()));
            }
            if e.variation >= 0 {
                obj.insert("variation".into(), Value::Number(e.variation.into()));
            }
            obj.insert("value".into(), e.value.clone());
            if !e.default_value.is_null() {
                obj.insert("default".into(), e.default_value.clone());
            }
            if let Some(prereq) = &e.prerequisite_of_flag_key {
                obj.insert("prereqOf".into(), Value::String(prereq.clone()));
            }
            if let Some(reason) = &e.reason {
                obj.insert("reason".into(), reason.clone());
            }
            if e.debug {
                obj.insert("context".into(), format_context(&e.context, policy));
            } else {
                obj.insert("contextKeys".into(), context_keys(&e.context));
            }
            Value::Object(obj)
        }
        Event::Identify(e) => {
            let mut obj = Map::new();
            obj.insert("kind".into(), Value::String("identify".into()));
            obj.insert("creationDate".into(), Value::Number(e.creation_date.as_millis().into()));
            obj.insert("context".into(), format_context(&e.context, policy));
            Value::Object(obj)
        }
        Event::Custom(e) => {
            let mut obj = Map::new();
            obj.insert("kind".into(), Value::String("custom".into()));
            obj.insert("creationDate".into(), Value::Number(e.creation_date.as_millis().into()));
            obj.insert("key".into(), Value::String(e.event_key.clone()));
            obj.insert("contextKeys".into(), context_keys(&e.context));
            if let Some(data) = &e.data {
                if !data.is_null() {
                    obj.insert("data".into(), data.clone());
                }
            }
            if let Some(metric_value) = e.metric_value {
                if let Some(num) = serde_json::Number::from_f64(metric_value) {
                    obj.insert("metricValue".into(), Value::Number(num));
                }
            }
            Value::Object(obj)
        }
        Event::Index(e) => {
            let mut obj = Map::new();
            obj.insert("kind".into(), Value::String("index".into()));
            obj.insert("creationDate".into(), Value::Number(e.creation_date.as_millis().into()));
            obj.insert("context".into(), format_context(&e.context, policy));
            Value::Object(obj)
        }
    }
}

fn format_summary(summary: &Summary) -> Value {
    let mut obj = Map::new();
    obj.insert("kind".into(), Value::String("summary".into()));
    obj.insert(
        "startDate".into(),
        Value::Number(summary.start_date().expect("non-empty summary has a start date").as_millis().into()),
    );
    obj.insert(
        "endDate".into(),
        Value::Number(summary.end_date().expect("non-empty summary has an end date").as_millis().into()),
    );

    let mut features = Map::new();
    for (flag_key, info) in summary.counters() {
        let mut flag_obj = Map::new();
        flag_obj.insert("default".into(), info.default_value.clone());
        flag_obj.insert(
            "contextKinds".into(),
            Value::Array(info.context_kinds.iter().cloned().map(Value::String).collect()),
        );

        let mut counters = Vec::new();
        for (version, version_counters) in info.versions() {
            for counter in version_counters.counters() {
                let mut counter_obj = Map::new();
                if counter.variation >= 0 {
                    counter_obj.insert("variation".into(), Value::Number(counter.variation.into()));
                }
                if *version >= 0 {
                    counter_obj.insert("version".into(), Value::Number((*version).into()));
                } else {
                    counter_obj.insert("unknown".into(), Value::Bool(true));
                }
                counter_obj.insert("value".into(), counter.value.clone());
                counter_obj.insert("count".into(), Value::Number(counter.count.into()));
                counters.push(Value::Object(counter_obj));
            }
        }
        flag_obj.insert("counters".into(), Value::Array(counters));
        features.insert(flag_key.clone(), Value::Object(flag_obj));
    }
    obj.insert("features".into(), Value::Object(features));

    Value::Object(obj)
}
