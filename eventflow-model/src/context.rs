//! Contexts — the subject an event is about.
//!
//! A context has one or more "kinds" (e.g. `user`, `organization`). Each
//! individual kind carries a key, an optional name, an anonymous flag,
//! arbitrary custom attributes, an optional secondary key, and its own
//! list of private attribute references.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::attr_ref::AttributeRef;
use crate::error::ContextError;

/// A single kind within a (possibly multi-kind) context.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleContext {
    /// The context kind, e.g. `"user"`.
    pub kind: String,
    /// The context key, unique within its kind.
    pub key: String,
    /// Whether this context represents an anonymous subject.
    pub anonymous: bool,
    /// Optional human-readable name.
    pub name: Option<String>,
    /// Custom attributes, in insertion order.
    pub attributes: Map<String, Value>,
    /// Optional secondary key used by percentage rollouts.
    pub secondary: Option<String>,
    /// Attribute references private to this context only.
    pub private_attributes: Vec<AttributeRef>,
}

impl SingleContext {
    /// Construct a new single-kind context with no attributes set.
    pub fn new(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            anonymous: false,
            name: None,
            attributes: Map::new(),
            secondary: None,
            private_attributes: Vec::new(),
        }
    }

    /// Builder-style: mark this context anonymous.
    #[must_use]
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// Builder-style: set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder-style: set a custom attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Builder-style: set the secondary key.
    #[must_use]
    pub fn secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    /// Builder-style: add a private attribute reference scoped to this
    /// context only.
    #[must_use]
    pub fn private(mut self, attr_ref: AttributeRef) -> Self {
        self.private_attributes.push(attr_ref);
        self
    }

    fn validate(&self) -> Result<(), ContextError> {
        if self.kind.is_empty() {
            return Err(ContextError::EmptyKind);
        }
        if self.key.is_empty() {
            return Err(ContextError::EmptyKey {
                kind: self.kind.clone(),
            });
        }
        Ok(())
    }
}

/// A context: one or more kinds describing the subject of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    kinds: Vec<SingleContext>,
}

impl Context {
    /// Construct a single-kind context.
    pub fn single(ctx: SingleContext) -> Self {
        Self { kinds: vec![ctx] }
    }

    /// Construct a multi-kind context. Fails if there are zero kinds or
    /// any kind name repeats.
    pub fn multi(kinds: Vec<SingleContext>) -> Result<Self, ContextError> {
        if kinds.is_empty() {
            return Err(ContextError::NoKinds);
        }
        let mut seen = BTreeSet::new();
        for k in &kinds {
            if !seen.insert(k.kind.clone()) {
                return Err(ContextError::DuplicateKind(k.kind.clone()));
            }
        }
        Ok(Self { kinds })
    }

    /// The constituent single-kind contexts, in construction order.
    pub fn kinds(&self) -> &[SingleContext] {
        &self.kinds
    }

    /// Whether this is a single-kind context (as opposed to multi-kind).
    pub fn is_single_kind(&self) -> bool {
        self.kinds.len() == 1
    }

    /// A context is valid iff every constituent kind has a non-empty
    /// `kind` and `key`. Invalid contexts must cause their event to be
    /// dropped, never a crash.
    pub fn validate(&self) -> Result<(), ContextError> {
        for k in &self.kinds {
            k.validate()?;
        }
        Ok(())
    }

    /// Whether this context passes [`Context::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// A stable key identifying this context for deduplication purposes:
    /// the sorted `kind:key` pairs of every constituent kind, joined.
    /// Two contexts with the same set of (kind, key) pairs dedup as the
    /// same subject regardless of attribute differences.
    pub fn dedup_key(&self) -> String {
        let mut pairs: Vec<String> = self
            .kinds
            .iter()
            .map(|k| format!("{}:{}", k.kind, k.key))
            .collect();
        pairs.sort();
        pairs.join(",")
    }
}
