//! Context redaction and JSON formatting.
//!
//! [`format_context`] is the only entry point: it walks a [`Context`],
//! applies private-attribute redaction against a global private list, a
//! per-context private list, and an `allAttributesPrivate` flag, and
//! produces the wire JSON object the collector expects.

use serde_json::{Map, Value};

use eventflow_model::{AttributeRef, Context, SingleContext};

/// Redaction policy applied while formatting a context.
#[derive(Debug, Clone, Copy)]
pub struct RedactionPolicy<'a> {
    /// Attribute references private across every context, regardless of
    /// kind (from SDK configuration).
    pub global_private: &'a [AttributeRef],
    /// Whether every top-level attribute (other than `kind`/`key`/
    /// `anonymous`) should be redacted whole, for every context.
    pub all_attributes_private: bool,
}

/// Format a context (single- or multi-kind) to its wire JSON
/// representation, applying [`RedactionPolicy`].
///
/// A multi-kind context is `{"kind":"multi", <kind>: <body>, ...}` where
/// each nested body omits its own `kind` field. A single-kind context
/// inlines its fields directly, including `kind`.
pub fn format_context(context: &Context, policy: &RedactionPolicy<'_>) -> Value {
    if context.is_single_kind() {
        format_single(&context.kinds()[0], policy, true)
    } else {
        let mut out = Map::new();
        out.insert("kind".into(), Value::String("multi".into()));
        for single in context.kinds() {
            out.insert(single.kind.clone(), format_single(single, policy, false));
        }
        Value::Object(out)
    }
}

fn format_single(ctx: &SingleContext, policy: &RedactionPolicy<'_>, include_kind: bool) -> Value {
    let mut out = Map::new();
    if include_kind {
        out.insert("kind".into(), Value::String(ctx.kind.clone()));
    }
    out.insert("key".into(), Value::String(ctx.key.clone()));
    if ctx.anonymous {
        out.insert("anonymous".into(), Value::Bool(true));
    }

    let all_refs: Vec<&AttributeRef> = policy
        .global_private
        .iter()
        .chain(ctx.private_attributes.iter())
        .collect();

    // `name` is a redactable top-level attribute like any other (only
    // `kind`/`key`/`anonymous` are exempt), so it runs through the same
    // redaction walk as the custom attributes rather than being inserted
    // ahead of it.
    let mut candidates = Map::new();
    if let Some(name) = &ctx.name {
        candidates.insert("name".into(), Value::String(name.clone()));
    }
    for (k, v) in &ctx.attributes {
        candidates.insert(k.clone(), v.clone());
    }

    let (attrs, redacted) = redact_top_level(&candidates, policy.all_attributes_private, &all_refs);
    for (k, v) in attrs {
        out.insert(k, v);
    }

    let mut meta = Map::new();
    if let Some(secondary) = &ctx.secondary {
        meta.insert("secondary".into(), Value::String(secondary.clone()));
    }
    if !redacted.is_empty() {
        meta.insert(
            "redactedAttributes".into(),
            Value::Array(redacted.into_iter().map(Value::String).collect()),
        );
    }
    if !meta.is_empty() {
        out.insert("_meta".into(), Value::Object(meta));
    }

    Value::Object(out)
}

/// Redact a set of top-level candidates (custom attributes, plus `name`
/// when present — every attribute but `kind`/`key`/`anonymous` is
/// redactable). Returns the surviving (possibly partially-redacted)
/// attributes in original order, and the list of canonical
/// redacted-attribute strings in first-detected order.
fn redact_top_level(
    attrs: &Map<String, Value>,
    all_private: bool,
    refs: &[&AttributeRef],
) -> (Vec<(String, Value)>, Vec<String>) {
    let mut out = Vec::with_capacity(attrs.len());
    let mut redacted = Vec::new();

    for (name, value) in attrs {
        if all_private {
            redacted.push(AttributeRef::literal(name.clone()).canonical());
            continue;
        }

        let matches: Vec<&AttributeRef> = refs
            .iter()
            .filter(|r| r.first_segment() == name.as_str())
            .copied()
            .collect();

        if matches.is_empty() {
            out.push((name.clone(), value.clone()));
            continue;
        }

        if let Some(exact) = matches.iter().find(|r| r.depth() == 1) {
            redacted.push(exact.canonical());
            continue;
        }

        if let Value::Object(obj) = value {
            let path = vec![name.clone()];
            let (new_obj, sub_redacted) = redact_nested(obj, &path, &matches);
            out.push((name.clone(), Value::Object(new_obj)));
            redacted.extend(sub_redacted);
        } else {
            // References expect a deeper path, but the value isn't an
            // object, so none of them can ever match. Emit as-is.
            out.push((name.clone(), value.clone()));
        }
    }

    (out, redacted)
}

fn redact_nested(
    obj: &Map<String, Value>,
    path: &[String],
    refs: &[&AttributeRef],
) -> (Map<String, Value>, Vec<String>) {
    let depth_here = path.len();
    let mut out = Map::new();
    let mut redacted = Vec::new();

    for (key, value) in obj {
        let matches: Vec<&AttributeRef> = refs
            .iter()
            .filter(|r| r.depth() > depth_here && r.segments()[depth_here] == *key)
            .copied()
            .collect();

        if matches.is_empty() {
            out.insert(key.clone(), value.clone());
            continue;
        }

        if let Some(exact) = matches.iter().find(|r| r.depth() == depth_here + 1) {
            redacted.push(exact.canonical());
            continue;
        }

        if let Value::Object(sub) = value {
            let mut next_path = path.to_vec();
            next_path.push(key.clone());
            let (new_obj, sub_redacted) = redact_nested(sub, &next_path, &matches);
            out.insert(key.clone(), Value::Object(new_obj));
            redacted.extend(sub_redacted);
        } else {
            out.insert(key.clone(), value.clone());
        }
    }

    (out, redacted)
}
