#![deny(missing_docs)]
//! # eventflow-sender — HTTP delivery for the eventflow analytics pipeline
//!
//! Implements [`eventflow_core::Sender`] over `reqwest`: POSTs formatted
//! payloads to the collector's `/bulk` and `/diagnostic` endpoints, retries
//! once on a recoverable failure, classifies unrecoverable failures so the
//! dispatcher can disable itself, and extracts the server's `Date` header
//! for clock-skew compensation.

pub mod client;
pub mod error;

pub use client::HttpSender;
pub use error::{classify_status, classify_transport_error, Classification, SendError};
