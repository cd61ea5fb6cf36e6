//! Error types for the data model.

use thiserror::Error;

/// A context failed validation.
///
/// Invalid contexts are never a reason to crash the pipeline — callers
/// drop the associated event silently and continue (see the dispatcher's
/// per-event handling).
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// One of the context's kinds had an empty `kind` string.
    #[error("context kind must not be empty")]
    EmptyKind,

    /// One of the context's kinds had an empty `key` string.
    #[error("context key must not be empty (kind: {kind})")]
    EmptyKey {
        /// The kind whose key was empty.
        kind: String,
    },

    /// A multi-kind context was constructed with no kinds at all.
    #[error("a context must have at least one kind")]
    NoKinds,

    /// A multi-kind context had the same kind repeated.
    #[error("duplicate context kind: {0}")]
    DuplicateKind(String),
}
