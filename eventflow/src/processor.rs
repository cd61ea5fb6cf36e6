//! [`EventProcessor`]: the single public entry point for submitting
//! events into the pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use eventflow_core::{
    Clock, ContextDeduplicator, DiagnosticStore, Dispatcher, DispatcherHandle, EventsConfig,
    LruContextDeduplicator, NullContextDeduplicator, Sender, SystemClock,
};
use eventflow_model::{AttributeRef, Context, CustomEvent, EpochMillis, Event, FeatureRequestEvent, IdentifyEvent};
use eventflow_sender::HttpSender;

/// Which context-deduplication strategy to wire up.
enum DeduplicatorChoice {
    /// Server-side flavor: an LRU of the given capacity, rotating every
    /// given interval.
    Lru { capacity: usize, rotation: Duration },
    /// Client-side flavor: never emits index events.
    Null,
    /// A caller-supplied strategy.
    Custom(Box<dyn ContextDeduplicator>),
}

/// Builds an [`EventProcessor`].
pub struct EventProcessorBuilder {
    sdk_key: String,
    config: EventsConfig,
    http_client: Option<reqwest::Client>,
    sender: Option<Arc<dyn Sender>>,
    dedup: DeduplicatorChoice,
    diagnostic_store: Option<Arc<dyn DiagnosticStore>>,
}

impl EventProcessorBuilder {
    /// Start building a processor for the given SDK key. The key is only
    /// used to set the `Authorization` header on outgoing requests.
    pub fn new(sdk_key: impl Into<String>) -> Self {
        Self {
            sdk_key: sdk_key.into(),
            config: EventsConfig::default(),
            http_client: None,
            sender: None,
            dedup: DeduplicatorChoice::Lru {
                capacity: 1000,
                rotation: Duration::from_secs(5 * 60),
            },
            diagnostic_store: None,
        }
    }

    /// Replace the default [`EventsConfig`].
    #[must_use]
    pub fn config(mut self, config: EventsConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply a pre-built `reqwest::Client` (for custom timeouts, proxy
    /// settings, etc). If not called, a default client is constructed.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Replace the HTTP delivery mechanism with a caller-supplied
    /// [`Sender`], bypassing [`HttpSender`] entirely. Mainly useful for
    /// tests and for routing events through an alternate transport.
    #[must_use]
    pub fn sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Use the client-side deduplication flavor: never emit index
    /// events. Appropriate when the collector already resolves context
    /// attributes through another channel.
    #[must_use]
    pub fn client_side_context_deduplication(mut self) -> Self {
        self.dedup = DeduplicatorChoice::Null;
        self
    }

    /// Use the server-side LRU deduplication flavor with a non-default
    /// capacity and rotation window.
    #[must_use]
    pub fn lru_context_deduplication(mut self, capacity: usize, rotation: Duration) -> Self {
        self.dedup = DeduplicatorChoice::Lru { capacity, rotation };
        self
    }

    /// Supply a caller-defined deduplication strategy.
    #[must_use]
    pub fn context_deduplicator(mut self, dedup: Box<dyn ContextDeduplicator>) -> Self {
        self.dedup = DeduplicatorChoice::Custom(dedup);
        self
    }

    /// Enable periodic diagnostic-statistics events, reported through the
    /// given store.
    #[must_use]
    pub fn diagnostic_store(mut self, store: Arc<dyn DiagnosticStore>) -> Self {
        self.diagnostic_store = Some(store);
        self
    }

    /// Build the processor and spawn its dispatcher task.
    pub fn build(self) -> EventProcessor {
        let sender = self.sender.unwrap_or_else(|| {
            let client = self.http_client.unwrap_or_default();
            let mut auth_value = reqwest::header::HeaderValue::from_str(&self.sdk_key)
                .unwrap_or_else(|_| reqwest::header::HeaderValue::from_static(""));
            auth_value.set_sensitive(true);

            Arc::new(
                HttpSender::new(client, self.config.events_base_uri.clone(), self.config.retry_delay())
                    .default_header(reqwest::header::AUTHORIZATION, auth_value),
            )
        });

        let dedup: Box<dyn ContextDeduplicator> = match self.dedup {
            DeduplicatorChoice::Lru { capacity, rotation } => {
                Box::new(LruContextDeduplicator::new(capacity, rotation))
            }
            DeduplicatorChoice::Null => Box::new(NullContextDeduplicator),
            DeduplicatorChoice::Custom(dedup) => dedup,
        };

        let handle = Dispatcher::spawn(self.config, dedup, sender, self.diagnostic_store);

        EventProcessor { handle }
    }
}

/// The single entry point for submitting analytics events.
///
/// Cheap to clone — internally just a handle to the dispatcher task.
#[derive(Clone)]
pub struct EventProcessor {
    handle: DispatcherHandle,
}

impl EventProcessor {
    /// Start building a processor for the given SDK key.
    pub fn builder(sdk_key: impl Into<String>) -> EventProcessorBuilder {
        EventProcessorBuilder::new(sdk_key)
    }

    /// A processor with every default: the no-op diagnostic store, the
    /// server-side LRU deduplicator, a fresh `reqwest::Client`.
    pub fn new(sdk_key: impl Into<String>) -> Self {
        Self::builder(sdk_key).build()
    }

    /// Submit a flag evaluation event.
    #[allow(clippy::too_many_arguments)]
    pub fn capture_feature_request(
        &self,
        flag_key: impl Into<String>,
        context: Context,
        flag_version: i64,
        variation: i64,
        value: Value,
        default_value: Value,
        reason: Option<Value>,
        prerequisite_of_flag_key: Option<String>,
        track_events: bool,
        debug_events_until_date: Option<i64>,
    ) {
        self.handle.send_event(Event::FeatureRequest(FeatureRequestEvent {
            creation_date: SystemClock.now(),
            flag_key: flag_key.into(),
            context,
            flag_version,
            variation,
            value,
            default_value,
            reason,
            prerequisite_of_flag_key,
            track_events,
            debug_events_until_date: debug_events_until_date.map(EpochMillis::from_millis),
            debug: false,
        }));
    }

    /// Submit an identify event.
    pub fn capture_identify(&self, context: Context) {
        self.handle.send_event(Event::Identify(IdentifyEvent {
            creation_date: SystemClock.now(),
            context,
        }));
    }

    /// Submit a custom application event.
    pub fn capture_custom(
        &self,
        event_key: impl Into<String>,
        context: Context,
        data: Option<Value>,
        metric_value: Option<f64>,
    ) {
        self.handle.send_event(Event::Custom(CustomEvent {
            creation_date: SystemClock.now(),
            event_key: event_key.into(),
            context,
            data,
            metric_value,
        }));
    }

    /// Request an out-of-band flush. Normally unnecessary — the
    /// dispatcher flushes on its own interval — but useful right before
    /// process exit in environments that don't call [`EventProcessor::close`].
    pub fn flush(&self) {
        self.handle.flush();
    }

    /// Drain the buffer, attempt one final delivery, and wait for every
    /// in-flight delivery to finish. After this returns, further
    /// `capture_*` calls are no-ops.
    pub async fn close(&self) {
        self.handle.close().await;
    }

    /// Total events dropped so far (buffer overflow, backpressure, or
    /// submitted while disabled).
    pub fn dropped_events(&self) -> u64 {
        self.handle.dropped_events()
    }

    /// Whether the pipeline has permanently disabled itself.
    pub fn is_disabled(&self) -> bool {
        self.handle.is_disabled()
    }
}

/// An always-empty attribute list, useful as a default in builder call
/// sites that don't need redaction.
pub fn no_private_attributes() -> Vec<AttributeRef> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventflow_model::SingleContext;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn builder_produces_a_working_processor() {
        let processor = EventProcessor::builder("test-sdk-key")
            .config(EventsConfig::default().flush_interval_set(StdDuration::from_secs(3600)))
            .build();

        processor.capture_identify(Context::single(SingleContext::new("user", "u1")));
        assert_eq!(processor.dropped_events(), 0);
        assert!(!processor.is_disabled());

        processor.close().await;
        assert!(processor.is_disabled());
    }

    #[test]
    fn no_private_attributes_is_empty() {
        assert!(no_private_attributes().is_empty());
    }
}
