//! The dispatcher: the single-owner state machine tying every other
//! component together.
//!
//! One dispatcher task owns the buffer, summarizer, and deduplicator
//! exclusively; user code and delivery workers only ever reach it through
//! [`DispatcherHandle`] and a message channel, so none of that state
//! needs a lock.

use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};

use eventflow_format::{format_output, RedactionPolicy};
use eventflow_model::{Context, CustomEvent, Event, FeatureRequestEvent, IdentifyEvent, IndexEvent};

use crate::buffer::EventBuffer;
use crate::clock::{Clock, SystemClock};
use crate::config::EventsConfig;
use crate::dedup::ContextDeduplicator;
use crate::diagnostics::{build_init_event, build_periodic_event, DiagnosticSnapshot, DiagnosticStore};
use crate::sender::{SendResult, Sender};
use crate::summarizer::Summarizer;

/// Messages the dispatcher task processes, one at a time, in receive
/// order.
enum Intake {
    SendEvent(Event),
    Flush,
    FlushCompleted(SendResult),
    DiagnosticTick,
    Shutdown(oneshot::Sender<()>),
}

/// A lightweight, cheaply cloneable reference to a running dispatcher.
///
/// Every method is infallible from the caller's point of view: a full
/// intake channel causes the event to be dropped and counted rather than
/// surfacing an error or blocking.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Intake>,
    dropped_events: Arc<AtomicU64>,
    disabled: Arc<AtomicBool>,
}

impl DispatcherHandle {
    /// Submit an event for processing. Never blocks; drops and counts the
    /// event if the intake channel is full.
    pub fn send_event(&self, event: Event) {
        if self.tx.try_send(Intake::SendEvent(event)).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Request a flush. Best-effort: if the intake channel happens to be
    /// full, the request is silently dropped (the periodic flush timer
    /// will run again shortly regardless).
    pub fn flush(&self) {
        let _ = self.tx.try_send(Intake::Flush);
    }

    /// Ask the diagnostic-recording interval to fire immediately. Exposed
    /// mainly for tests; production callers rely on the internal timer.
    pub fn trigger_diagnostic_tick(&self) {
        let _ = self.tx.try_send(Intake::DiagnosticTick);
    }

    /// Drain the buffer, attempt one final delivery, and wait for every
    /// in-flight delivery (including this one) to finish. After this
    /// returns, further calls to [`DispatcherHandle::send_event`] are
    /// no-ops (the dispatcher task has exited).
    pub async fn close(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Intake::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Total events dropped so far: buffer overflow, backpressure, and
    /// events submitted while disabled.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Whether the pipeline has permanently disabled itself after an
    /// unrecoverable delivery error (or completed shutdown).
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }
}

/// Builds and runs the dispatcher task.
pub struct Dispatcher {
    config: EventsConfig,
    buffer: EventBuffer,
    summarizer: Summarizer,
    dedup: Box<dyn ContextDeduplicator>,
    sender: Arc<dyn Sender>,
    clock: Arc<dyn Clock>,
    diagnostic_store: Option<Arc<dyn DiagnosticStore>>,
    disabled: Arc<AtomicBool>,
    dropped_events: Arc<AtomicU64>,
    in_flight: usize,
    last_known_server_time: Option<eventflow_model::EpochMillis>,
    deduplicated_users: u64,
    events_in_last_batch: u64,
    diagnostics_since: eventflow_model::EpochMillis,
    rx: mpsc::Receiver<Intake>,
    self_tx: mpsc::Sender<Intake>,
}

impl Dispatcher {
    /// Construct and spawn the dispatcher task, returning a handle to it.
    pub fn spawn(
        config: EventsConfig,
        dedup: Box<dyn ContextDeduplicator>,
        sender: Arc<dyn Sender>,
        diagnostic_store: Option<Arc<dyn DiagnosticStore>>,
    ) -> DispatcherHandle {
        Self::spawn_with_clock(config, dedup, sender, diagnostic_store, Arc::new(SystemClock))
    }

    /// Same as [`Dispatcher::spawn`] but with an injectable clock, used by
    /// tests that need deterministic debug-expiry behavior.
    pub fn spawn_with_clock(
        config: EventsConfig,
        dedup: Box<dyn ContextDeduplicator>,
        sender: Arc<dyn Sender>,
        diagnostic_store: Option<Arc<dyn DiagnosticStore>>,
        clock: Arc<dyn Clock>,
    ) -> DispatcherHandle {
        let (tx, rx) = mpsc::channel(config.intake_queue_capacity);
        let dropped_events = Arc::new(AtomicU64::new(0));
        let disabled = Arc::new(AtomicBool::new(false));
        let now = clock.now();

        let dispatcher = Dispatcher {
            buffer: EventBuffer::new(config.capacity()),
            summarizer: Summarizer::new(),
            dedup,
            sender,
            clock,
            diagnostic_store,
            disabled: Arc::clone(&disabled),
            dropped_events: Arc::clone(&dropped_events),
            in_flight: 0,
            last_known_server_time: None,
            deduplicated_users: 0,
            events_in_last_batch: 0,
            diagnostics_since: now,
            rx,
            self_tx: tx.clone(),
            config,
        };

        tokio::spawn(dispatcher.run());

        DispatcherHandle {
            tx,
            dropped_events,
            disabled,
        }
    }

    async fn run(mut self) {
        self.send_diagnostic_init();

        let mut flush_ticker = tokio::time::interval(self.config.flush_interval);
        flush_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut dedup_ticker: Option<Interval> = self.dedup.flush_interval().map(|d| {
            let mut t = tokio::time::interval(d);
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
            t
        });

        let mut diagnostic_ticker: Option<Interval> = self.diagnostic_store.as_ref().map(|_| {
            let mut t = tokio::time::interval(self.config.diagnostic_recording_interval());
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
            t
        });

        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    match msg {
                        Some(Intake::SendEvent(event)) => self.handle_event(event),
                        Some(Intake::Flush) => self.do_flush(),
                        Some(Intake::FlushCompleted(result)) => {
                            self.in_flight = self.in_flight.saturating_sub(1);
                            self.apply_send_result(&result);
                        }
                        Some(Intake::DiagnosticTick) => self.do_diagnostic_flush(),
                        Some(Intake::Shutdown(ack)) => {
                            self.handle_shutdown(ack).await;
                            return;
                        }
                        None => return,
                    }
                }
                _ = flush_ticker.tick() => self.do_flush(),
                _ = tick_opt(&mut dedup_ticker) => self.dedup.flush(),
                _ = tick_opt(&mut diagnostic_ticker) => self.do_diagnostic_flush(),
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        if self.disabled.load(Ordering::Relaxed) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if !event.context().is_valid() {
            tracing::debug!("dropping event with invalid context");
            return;
        }
        match event {
            Event::FeatureRequest(e) => self.handle_feature(e),
            Event::Identify(e) => self.handle_identify(e),
            Event::Custom(e) => self.handle_custom(e),
            Event::Index(_) => {
                // Only ever synthesized internally; ignore if submitted directly.
            }
        }
    }

    fn handle_feature(&mut self, e: FeatureRequestEvent) {
        let kinds: Vec<String> = e.context.kinds().iter().map(|k| k.kind.clone()).collect();
        self.summarizer.summarize(
            e.creation_date,
            &e.flag_key,
            e.flag_version,
            e.variation,
            &e.value,
            &e.default_value,
            kinds,
        );

        self.maybe_emit_index(&e.context, e.creation_date);

        if e.track_events {
            let mut full_event = e.clone();
            full_event.debug = false;
            self.append_with_overflow(Event::FeatureRequest(full_event));
        }

        if self.is_debug_eligible(&e) {
            let mut debug_event = e;
            debug_event.debug = true;
            self.append_with_overflow(Event::FeatureRequest(debug_event));
        }
    }

    fn handle_identify(&mut self, e: IdentifyEvent) {
        // Updates dedup state so no later Index is emitted for this
        // context in the window, but the return value is never consulted
        // — an identify event is never itself preceded by a synthesized
        // index.
        let _ = self.dedup.process_context(&e.context);
        self.append_with_overflow(Event::Identify(e));
    }

    fn handle_custom(&mut self, e: CustomEvent) {
        self.maybe_emit_index(&e.context, e.creation_date);
        self.append_with_overflow(Event::Custom(e));
    }

    fn maybe_emit_index(&mut self, context: &Context, creation_date: eventflow_model::EpochMillis) {
        if self.dedup.process_context(context) {
            self.append_with_overflow(Event::Index(IndexEvent {
                creation_date,
                context: context.clone(),
            }));
        } else {
            self.deduplicated_users += 1;
        }
    }

    fn is_debug_eligible(&self, e: &FeatureRequestEvent) -> bool {
        let Some(until) = e.debug_events_until_date else {
            return false;
        };
        let local_now = self.clock.now();
        let threshold = match self.last_known_server_time {
            Some(server_time) => local_now.max(server_time),
            None => local_now,
        };
        until.as_millis() > threshold.as_millis()
    }

    fn append_with_overflow(&mut self, event: Event) {
        if !self.buffer.append(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("event buffer full; dropping event");
        }
    }

    fn apply_send_result(&mut self, result: &SendResult) {
        if result.must_shut_down {
            self.disabled.store(true, Ordering::Relaxed);
            tracing::error!("unrecoverable delivery error; disabling event pipeline");
        }
        if let Some(server_time) = result.server_time {
            self.last_known_server_time = Some(server_time);
        }
    }

    fn redaction_policy(&self) -> RedactionPolicy<'_> {
        RedactionPolicy {
            global_private: &self.config.private_attributes,
            all_attributes_private: self.config.all_attributes_private,
        }
    }

    fn do_flush(&mut self) {
        let drained = self.buffer.drain();
        let summary = self.summarizer.snapshot_and_reset();
        if drained.is_empty() && summary.is_empty() {
            return;
        }
        if self.in_flight >= self.config.max_in_flight_flushes {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("too many in-flight deliveries; dropping flush payload");
            return;
        }

        let formatted = format_output(&drained, &summary, &self.redaction_policy());
        let bytes = match serde_json::to_vec(&formatted.body) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize event payload; dropping");
                return;
            }
        };
        self.events_in_last_batch = formatted.count as u64;

        self.in_flight += 1;
        let sender = Arc::clone(&self.sender);
        let tx = self.self_tx.clone();
        let count = formatted.count;
        tokio::spawn(async move {
            let result = sender.send_analytics_events(bytes, count).await;
            let _ = tx.send(Intake::FlushCompleted(result)).await;
        });
    }

    /// Send the one-shot `diagnostic-init` event, if a diagnostic store is
    /// configured. Best-effort: like periodic diagnostic delivery, a
    /// failure here never disables the pipeline or updates
    /// `last_known_server_time`.
    fn send_diagnostic_init(&self) {
        let Some(store) = self.diagnostic_store.clone() else {
            return;
        };
        let ctx = store.context();
        let event = build_init_event(
            &ctx,
            self.clock.now(),
            store.sdk_info(),
            store.configuration_info(),
            store.platform_info(),
        );
        let Ok(bytes) = serde_json::to_vec(&event) else {
            return;
        };
        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            let _ = sender.send_diagnostic_event(bytes).await;
        });
    }

    fn do_diagnostic_flush(&mut self) {
        let Some(store) = self.diagnostic_store.clone() else {
            return;
        };
        let ctx = store.context();
        let now = self.clock.now();
        let snapshot = DiagnosticSnapshot {
            data_since_date: self.diagnostics_since,
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            deduplicated_users: self.deduplicated_users,
            events_in_last_batch: self.events_in_last_batch,
            stream_inits: Vec::new(),
        };
        self.diagnostics_since = now;
        self.deduplicated_users = 0;

        let event = build_periodic_event(&ctx, now, &snapshot);
        let Ok(bytes) = serde_json::to_vec(&event) else {
            return;
        };
        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            let _ = sender.send_diagnostic_event(bytes).await;
        });
    }

    async fn handle_shutdown(&mut self, ack: oneshot::Sender<()>) {
        self.disabled.store(true, Ordering::Relaxed);

        let drained = self.buffer.drain();
        let summary = self.summarizer.snapshot_and_reset();
        if !(drained.is_empty() && summary.is_empty()) {
            let formatted = format_output(&drained, &summary, &self.redaction_policy());
            if let Ok(bytes) = serde_json::to_vec(&formatted.body) {
                let result = self.sender.send_analytics_events(bytes, formatted.count).await;
                self.apply_send_result(&result);
            }
        }

        while self.in_flight > 0 {
            match self.rx.recv().await {
                Some(Intake::FlushCompleted(result)) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.apply_send_result(&result);
                }
                Some(_) => {
                    // Any further intake during drain-wait is a no-op.
                }
                None => break,
            }
        }

        let _ = ack.send(());
    }
}

async fn tick_opt(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::dedup::NullContextDeduplicator;
    use eventflow_model::{EpochMillis, SingleContext};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedClock(Mutex<i64>);

    impl Clock for FixedClock {
        fn now(&self) -> EpochMillis {
            EpochMillis::from_millis(*self.0.lock().unwrap())
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        payloads: Mutex<Vec<Vec<u8>>>,
        diagnostic_payloads: Mutex<Vec<Vec<u8>>>,
        result: Mutex<Option<SendResult>>,
    }

    #[async_trait::async_trait]
    impl Sender for RecordingSender {
        async fn send_analytics_events(&self, bytes: Vec<u8>, _count: usize) -> SendResult {
            self.payloads.lock().unwrap().push(bytes);
            self.result.lock().unwrap().clone().unwrap_or_else(SendResult::ok)
        }

        async fn send_diagnostic_event(&self, bytes: Vec<u8>) -> SendResult {
            self.diagnostic_payloads.lock().unwrap().push(bytes);
            SendResult::ok()
        }
    }

    fn ctx(key: &str) -> Context {
        Context::single(SingleContext::new("user", key))
    }

    fn test_config() -> EventsConfig {
        EventsConfig::default().flush_interval_set(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn identify_event_flushes_as_a_single_inline_payload() {
        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            None,
        );

        handle.send_event(Event::Identify(IdentifyEvent {
            creation_date: 100.into(),
            context: Context::single(SingleContext::new("user", "u1").name("Red")),
        }));
        handle.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;

        let payloads = sender.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
        let arr = body.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["kind"], "identify");
        assert_eq!(arr[0]["context"]["name"], "Red");
    }

    #[tokio::test]
    async fn summary_aggregation_scenario() {
        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            None,
        );

        let c = ctx("u1");
        for (ts, flag, ver, var, val) in [
            (1000, "f1", 11, 1, "v1"),
            (1000, "f1", 11, 1, "v1"),
            (1000, "f1", 11, 2, "v2"),
            (2000, "f2", 22, 2, "v2"),
        ] {
            let default = if flag == "f1" { "d1" } else { "d2" };
            handle.send_event(Event::FeatureRequest(FeatureRequestEvent {
                creation_date: ts.into(),
                flag_key: flag.into(),
                context: c.clone(),
                flag_version: ver,
                variation: var,
                value: json!(val),
                default_value: json!(default),
                reason: None,
                prerequisite_of_flag_key: None,
                track_events: false,
                debug_events_until_date: None,
                debug: false,
            }));
        }
        handle.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;

        let payloads = sender.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
        let arr = body.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        let summary = &arr[0];
        assert_eq!(summary["kind"], "summary");
        assert_eq!(summary["startDate"], 1000);
        assert_eq!(summary["endDate"], 2000);
        assert_eq!(summary["features"]["f1"]["default"], "d1");
        assert_eq!(summary["features"]["f2"]["default"], "d2");
    }

    #[tokio::test]
    async fn index_emitted_once_per_context_window() {
        struct AlwaysFirstThenSeen(Mutex<bool>);
        impl ContextDeduplicator for AlwaysFirstThenSeen {
            fn process_context(&mut self, _context: &Context) -> bool {
                let mut first = self.0.lock().unwrap();
                let was_first = *first;
                *first = false;
                was_first
            }
            fn flush(&mut self) {}
        }

        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(AlwaysFirstThenSeen(Mutex::new(true))),
            sender.clone(),
            None,
        );

        let c = ctx("u1");
        for _ in 0..2 {
            handle.send_event(Event::FeatureRequest(FeatureRequestEvent {
                creation_date: 1.into(),
                flag_key: "f1".into(),
                context: c.clone(),
                flag_version: 1,
                variation: 0,
                value: json!(true),
                default_value: json!(false),
                reason: None,
                prerequisite_of_flag_key: None,
                track_events: true,
                debug_events_until_date: None,
                debug: false,
            }));
        }
        handle.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;

        let payloads = sender.payloads.lock().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
        let arr = body.as_array().unwrap();
        let kinds: Vec<&str> = arr.iter().map(|e| e["kind"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["index", "feature", "feature", "summary"]);
    }

    #[tokio::test]
    async fn debug_event_suppressed_when_server_clock_is_ahead() {
        let clock = Arc::new(FixedClock(Mutex::new(1_000_000)));
        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn_with_clock(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            None,
            clock,
        );

        // No server time observed yet: debug_events_until_date in the
        // future relative to local clock should produce a debug event.
        handle.send_event(Event::FeatureRequest(FeatureRequestEvent {
            creation_date: 1.into(),
            flag_key: "f1".into(),
            context: ctx("u1"),
            flag_version: 1,
            variation: 0,
            value: json!(true),
            default_value: json!(false),
            reason: None,
            prerequisite_of_flag_key: None,
            track_events: false,
            debug_events_until_date: Some(2_000_000.into()),
            debug: false,
        }));
        handle.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let has_debug = {
            let payloads = sender.payloads.lock().unwrap();
            let body: serde_json::Value = serde_json::from_slice(payloads.last().unwrap()).unwrap();
            body.as_array()
                .unwrap()
                .iter()
                .any(|e| e["kind"] == "debug")
        };
        assert!(has_debug);
        handle.close().await;
    }

    #[tokio::test]
    async fn unrecoverable_error_disables_future_deliveries() {
        let sender = Arc::new(RecordingSender::default());
        *sender.result.lock().unwrap() = Some(SendResult::unrecoverable_failure());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            None,
        );

        handle.send_event(Event::Identify(IdentifyEvent {
            creation_date: 1.into(),
            context: ctx("u1"),
        }));
        handle.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_disabled());

        handle.send_event(Event::Identify(IdentifyEvent {
            creation_date: 2.into(),
            context: ctx("u2"),
        }));
        handle.flush();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Still only the one payload from before disabling.
        assert_eq!(sender.payloads.lock().unwrap().len(), 1);
        handle.close().await;
    }

    #[tokio::test]
    async fn close_drains_buffer_and_delivers_final_payload() {
        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            None,
        );

        handle.send_event(Event::Identify(IdentifyEvent {
            creation_date: 1.into(),
            context: ctx("u1"),
        }));
        // No explicit flush() call: close() must drain and deliver itself.
        handle.close().await;

        assert_eq!(sender.payloads.lock().unwrap().len(), 1);
        assert!(handle.is_disabled());
    }

    #[tokio::test]
    async fn diagnostic_init_event_is_sent_once_at_startup() {
        use crate::diagnostics::{DiagnosticContext, DiagnosticStore};

        struct FixedStore;
        impl DiagnosticStore for FixedStore {
            fn context(&self) -> DiagnosticContext {
                DiagnosticContext {
                    sdk_key_suffix: "abcd".into(),
                    diagnostic_id: "fixed-id".into(),
                }
            }
        }

        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            Some(Arc::new(FixedStore)),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;

        let diagnostics = sender.diagnostic_payloads.lock().unwrap();
        assert_eq!(diagnostics.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&diagnostics[0]).unwrap();
        assert_eq!(body["kind"], "diagnostic-init");
        assert_eq!(body["id"]["sdkKeySuffix"], "abcd");
        assert!(sender.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deduplicated_users_counter_resets_each_diagnostic_period() {
        use crate::diagnostics::{DiagnosticContext, DiagnosticStore};

        struct FixedStore;
        impl DiagnosticStore for FixedStore {
            fn context(&self) -> DiagnosticContext {
                DiagnosticContext::default()
            }
        }

        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            Some(Arc::new(FixedStore)),
        );
        // Drain the startup diagnostic-init payload.
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.diagnostic_payloads.lock().unwrap().clear();

        handle.send_event(Event::Custom(CustomEvent {
            creation_date: 1.into(),
            event_key: "did-something".into(),
            context: ctx("u1"),
            data: None,
            metric_value: None,
        }));
        handle.send_event(Event::Custom(CustomEvent {
            creation_date: 2.into(),
            event_key: "did-something".into(),
            context: ctx("u2"),
            data: None,
            metric_value: None,
        }));
        handle.trigger_diagnostic_tick();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.send_event(Event::Custom(CustomEvent {
            creation_date: 3.into(),
            event_key: "did-something".into(),
            context: ctx("u3"),
            data: None,
            metric_value: None,
        }));
        handle.trigger_diagnostic_tick();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close().await;

        let diagnostics = sender.diagnostic_payloads.lock().unwrap();
        assert_eq!(diagnostics.len(), 2);
        let first: serde_json::Value = serde_json::from_slice(&diagnostics[0]).unwrap();
        let second: serde_json::Value = serde_json::from_slice(&diagnostics[1]).unwrap();
        assert_eq!(first["deduplicatedUsers"], 2);
        // Must report only the period's own count, not the lifetime total.
        assert_eq!(second["deduplicatedUsers"], 1);
    }

    #[tokio::test]
    async fn invalid_context_is_dropped_without_crashing() {
        let sender = Arc::new(RecordingSender::default());
        let handle = Dispatcher::spawn(
            test_config(),
            Box::new(NullContextDeduplicator),
            sender.clone(),
            None,
        );

        handle.send_event(Event::Identify(IdentifyEvent {
            creation_date: 1.into(),
            context: Context::single(SingleContext::new("user", "")),
        }));
        handle.close().await;

        assert_eq!(sender.payloads.lock().unwrap().len(), 0);
    }
}
