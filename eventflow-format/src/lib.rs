#![deny(missing_docs)]
//! # eventflow-format — JSON wire formatting
//!
//! Turns [`eventflow_model`] types into the collector's wire JSON. Two
//! entry points:
//!
//! - [`context_formatter::format_context`] — a single context, with
//!   private-attribute redaction applied.
//! - [`output_formatter::format_output`] — a full delivery payload: a
//!   batch of events plus a trailing summary element.
//!
//! Neither walks via reflection; both are direct, explicit tree walks
//! over `serde_json::Value`, matching the "replace reflection-based
//! serialization with a direct streaming writer" redesign this crate
//! implements.

pub mod context_formatter;
pub mod output_formatter;

pub use context_formatter::{format_context, RedactionPolicy};
pub use output_formatter::{format_output, FormattedOutput};
