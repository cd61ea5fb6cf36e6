#![deny(missing_docs)]
//! # eventflow — umbrella crate for the analytics event pipeline
//!
//! Provides a single import surface over the `eventflow-*` family:
//! [`eventflow_model`] (data types), [`eventflow_format`] (JSON wire
//! formatting), [`eventflow_core`] (the dispatcher and its owned
//! components), and [`eventflow_sender`] (HTTP delivery). The one public
//! entry point most applications need is [`EventProcessor`]: construct it
//! once at SDK init with [`EventProcessorBuilder`], call `capture_*` for
//! every evaluation/identify/custom event, and `close` it at shutdown.

pub use eventflow_core;
pub use eventflow_format;
pub use eventflow_model;
pub use eventflow_sender;

mod processor;

pub use processor::{EventProcessor, EventProcessorBuilder};

/// Happy-path imports for building an event pipeline.
pub mod prelude {
    pub use eventflow_core::{
        ContextDeduplicator, Dispatcher, DispatcherHandle, EventsConfig, LruContextDeduplicator,
        NullContextDeduplicator, SendResult, Sender,
    };
    pub use eventflow_model::{AttributeRef, Context, Event, SingleContext};
    pub use eventflow_sender::HttpSender;

    pub use crate::{EventProcessor, EventProcessorBuilder};
}
