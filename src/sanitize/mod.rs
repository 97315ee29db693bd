//! Control-character stripping and markup neutralization for request data

pub mod middleware;

use serde_json::Value;
use std::borrow::Cow;
use tracing::warn;

use crate::metrics::registry::SANITIZED_FIELDS_TOTAL;

pub use middleware::{sanitize_request, SanitizeSettings};

/// Longest preview of a rewritten value written to the log
const PREVIEW_CHARS: usize = 100;

/// Remove ASCII control characters (0x00-0x1F and 0x7F)
pub fn strip_control_chars(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_control) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.chars().filter(|c| !is_control(*c)).collect())
}

fn is_control(c: char) -> bool {
    (c as u32) <= 0x1F || c == '\u{7F}'
}

/// Escape markup so it renders as inert text
///
/// Strings without angle brackets cannot carry tags and are left as they are.
pub fn escape_markup(input: &str) -> Cow<'_, str> {
    if !input.contains(['<', '>']) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Visit every string leaf of `value` with its dot/bracket path
pub fn visit_strings<F>(value: &mut Value, path: &str, f: &mut F)
where
    F: FnMut(&str, &mut String),
{
    match value {
        Value::String(s) => f(path, s),
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                visit_strings(item, &format!("{path}[{i}]"), f);
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                visit_strings(item, &child, f);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// A string leaf rewritten by markup escaping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedLeaf {
    pub field: String,
    /// Original value, truncated
    pub preview: String,
}

/// Run both sanitizer passes over `value` in place
///
/// Returns the leaves whose markup was escaped.
pub fn sanitize_value(value: &mut Value, root: &str) -> Vec<SanitizedLeaf> {
    visit_strings(value, root, &mut |_, s| {
        if let Cow::Owned(stripped) = strip_control_chars(s) {
            *s = stripped;
        }
    });

    let mut changed = Vec::new();
    visit_strings(value, root, &mut |path, s| {
        if let Cow::Owned(escaped) = escape_markup(s) {
            changed.push(SanitizedLeaf {
                field: path.to_string(),
                preview: s.chars().take(PREVIEW_CHARS).collect(),
            });
            *s = escaped;
        }
    });
    changed
}

pub fn log_sanitized(leaves: &[SanitizedLeaf], path: &str, ip: &str) {
    for leaf in leaves {
        warn!(
            field = %leaf.field,
            preview = %leaf.preview,
            path = %path,
            ip = %ip,
            "Potential XSS payload neutralized"
        );
        SANITIZED_FIELDS_TOTAL.inc();
    }
}
