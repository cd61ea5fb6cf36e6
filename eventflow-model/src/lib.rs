#![deny(missing_docs)]
//! # eventflow-model — data types for the eventflow analytics pipeline
//!
//! This crate defines the wire-agnostic data model shared by every other
//! `eventflow-*` crate: [`Event`] (the tagged union of evaluation,
//! identify, custom, and index events), [`Context`] (the subject an event
//! is about), [`AttributeRef`] (a pointer into a context's attributes used
//! for private-attribute redaction), and [`Summary`] (aggregated evaluation
//! counters).
//!
//! None of these types know how to serialize themselves to the collector's
//! wire format — that's `eventflow-format`'s job. This crate only defines
//! what the data *is*.

pub mod attr_ref;
pub mod context;
pub mod error;
pub mod event;
pub mod millis;
pub mod summary;

pub use attr_ref::AttributeRef;
pub use context::{Context, SingleContext};
pub use error::ContextError;
pub use event::{CustomEvent, Event, FeatureRequestEvent, IdentifyEvent, IndexEvent};
pub use millis::EpochMillis;
pub use summary::{FlagInfo, Summary, VariationCounter, VersionCounters};
