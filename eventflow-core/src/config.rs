//! Configuration consumed by the dispatcher.

use std::time::Duration;

use eventflow_model::AttributeRef;

/// Minimum enforced diagnostic recording interval (60 seconds).
pub const MIN_DIAGNOSTIC_RECORDING_INTERVAL: Duration = Duration::from_secs(60);

/// Default retry delay used when none is configured or the configured
/// value is non-positive.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Default number of concurrent in-flight deliveries allowed before the
/// dispatcher starts dropping flushes for backpressure.
pub const DEFAULT_MAX_IN_FLIGHT_FLUSHES: usize = 5;

/// Static configuration for the event pipeline.
///
/// Values outside their valid range are clamped rather than rejected: a
/// zero or negative buffer capacity becomes 1, a non-positive retry
/// delay becomes the default, and a diagnostic interval under 60s is
/// raised to 60s.
#[derive(Debug, Clone)]
pub struct EventsConfig {
    capacity: usize,
    /// How often the dispatcher should trigger an automatic flush.
    pub flush_interval: Duration,
    diagnostic_recording_interval: Duration,
    /// Whether every context attribute is private, regardless of any
    /// explicit private-attribute list.
    pub all_attributes_private: bool,
    /// Attribute references private across every context.
    pub private_attributes: Vec<AttributeRef>,
    /// Base URI of the collection service.
    pub events_base_uri: String,
    retry_delay: Duration,
    /// Maximum number of concurrent in-flight deliveries before new
    /// flushes are dropped for backpressure.
    pub max_in_flight_flushes: usize,
    /// Capacity of the dispatcher's intake message channel. A full
    /// channel causes `SendEvent` messages to be dropped and counted
    /// rather than blocking the calling thread.
    pub intake_queue_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            flush_interval: Duration::from_secs(5),
            diagnostic_recording_interval: Duration::from_secs(15 * 60),
            all_attributes_private: false,
            private_attributes: Vec::new(),
            events_base_uri: "https://events.example.com".into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            max_in_flight_flushes: DEFAULT_MAX_IN_FLIGHT_FLUSHES,
            intake_queue_capacity: 10_000,
        }
    }
}

impl EventsConfig {
    /// The effective buffer capacity: always >= 1.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Builder-style: set the event buffer capacity. Clamped to >= 1.
    #[must_use]
    pub fn capacity_set(mut self, capacity: i64) -> Self {
        self.capacity = capacity.max(1) as usize;
        self
    }

    /// The effective diagnostic recording interval: always >= 60s.
    pub fn diagnostic_recording_interval(&self) -> Duration {
        self.diagnostic_recording_interval
    }

    /// Builder-style: set the diagnostic recording interval. Clamped up
    /// to [`MIN_DIAGNOSTIC_RECORDING_INTERVAL`].
    #[must_use]
    pub fn diagnostic_recording_interval_set(mut self, interval: Duration) -> Self {
        self.diagnostic_recording_interval = interval.max(MIN_DIAGNOSTIC_RECORDING_INTERVAL);
        self
    }

    /// The effective retry delay: always > 0.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Builder-style: set the retry delay. A zero duration falls back to
    /// [`DEFAULT_RETRY_DELAY`].
    #[must_use]
    pub fn retry_delay_set(mut self, delay: Duration) -> Self {
        self.retry_delay = if delay.is_zero() { DEFAULT_RETRY_DELAY } else { delay };
        self
    }

    /// Builder-style: set the flush interval.
    #[must_use]
    pub fn flush_interval_set(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Builder-style: set the events base URI.
    #[must_use]
    pub fn events_base_uri_set(mut self, uri: impl Into<String>) -> Self {
        self.events_base_uri = uri.into();
        self
    }

    /// Builder-style: mark every context attribute private.
    #[must_use]
    pub fn all_attributes_private_set(mut self, value: bool) -> Self {
        self.all_attributes_private = value;
        self
    }

    /// Builder-style: set the global private-attribute list.
    #[must_use]
    pub fn private_attributes_set(mut self, refs: Vec<AttributeRef>) -> Self {
        self.private_attributes = refs;
        self
    }

    /// Builder-style: set the max in-flight flush worker count.
    #[must_use]
    pub fn max_in_flight_flushes_set(mut self, max: usize) -> Self {
        self.max_in_flight_flushes = max.max(1);
        self
    }

    /// Builder-style: set the intake channel capacity.
    #[must_use]
    pub fn intake_queue_capacity_set(mut self, capacity: usize) -> Self {
        self.intake_queue_capacity = capacity.max(1);
        self
    }
}
