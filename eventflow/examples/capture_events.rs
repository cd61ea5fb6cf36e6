//! Wiring up an `EventProcessor` and capturing a handful of events.
//!
//! Run with:
//!
//! ```sh
//! cargo run --example capture_events -p eventflow
//! ```

use std::time::Duration;

use eventflow::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() {
    // 1. Build a processor pointed at the collection service, flushing
    //    every second instead of the five-second default so this example
    //    doesn't have to wait around.
    let config = EventsConfig::default().flush_interval_set(Duration::from_secs(1));
    let processor = EventProcessor::builder("sdk-key-goes-here")
        .config(config)
        .build();

    // 2. Identify the subject these events are about.
    let context = Context::single(
        SingleContext::new("user", "user-123")
            .name("Jane Doe")
            .attribute("plan", json!("enterprise")),
    );
    processor.capture_identify(context.clone());

    // 3. Record a flag evaluation. `track_events` is false here, so this
    //    evaluation only contributes to the periodic summary unless the
    //    flag has debug-until set server-side.
    processor.capture_feature_request(
        "new-checkout-flow",
        context.clone(),
        4,
        1,
        json!(true),
        json!(false),
        None,
        None,
        false,
        None,
    );

    // 4. Record a custom business event.
    processor.capture_custom("checkout-completed", context, Some(json!({"cartValue": 42.5})), Some(42.5));

    // 5. Close the processor: this drains whatever hasn't been flushed
    //    yet, delivers it, and waits for delivery to finish before
    //    returning.
    processor.close().await;

    println!("dropped events: {}", processor.dropped_events());
}
