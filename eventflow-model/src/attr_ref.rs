//! Attribute references — pointers into a context's custom attributes.
//!
//! A reference with depth 1 names a top-level attribute. A reference with
//! depth > 1 is a JSON-pointer-like path into an object-valued attribute,
//! using `~0`/`~1` escaping for literal `~`/`/` inside a path segment
//! (the same escaping RFC 6901 uses, applied only when the reference is in
//! path form).

use serde::{Deserialize, Serialize};

/// A pointer to an attribute, or a sub-path within an object-valued
/// attribute. Depth is always >= 1 for a successfully parsed reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRef {
    segments: Vec<String>,
}

impl AttributeRef {
    /// Parse a reference from its canonical or literal string form.
    ///
    /// A string starting with `/` is parsed as a path, splitting on `/`
    /// and unescaping `~1` -> `/` and `~0` -> `~` in each segment. Any
    /// other string is a single literal top-level attribute name, even if
    /// it happens to contain `/` or `~` characters.
    pub fn parse(s: &str) -> Self {
        if let Some(rest) = s.strip_prefix('/') {
            let segments = rest.split('/').map(unescape_segment).collect();
            Self { segments }
        } else {
            Self {
                segments: vec![s.to_string()],
            }
        }
    }

    /// Construct a depth-1 reference directly from a literal attribute name.
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Construct a multi-segment path reference directly.
    pub fn path(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Number of path segments. Always >= 1.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The parsed, unescaped path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment — the top-level attribute name this reference
    /// ultimately points into, regardless of depth.
    pub fn first_segment(&self) -> &str {
        &self.segments[0]
    }

    /// Render the canonical wire string form: a bare literal when depth is
    /// 1 and the name contains neither `/` nor `~`, otherwise an
    /// escaped path beginning with `/`.
    pub fn canonical(&self) -> String {
        if self.segments.len() == 1 {
            let name = &self.segments[0];
            if !name.contains('/') && !name.contains('~') {
                return name.clone();
            }
        }
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            out.push_str(&escape_segment(seg));
        }
        out
    }
}

impl std::fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

fn escape_segment(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(s: &str) -> String {
    s.replace("~1", "/").replace("~0", "~")
}
