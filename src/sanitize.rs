//! Input sanitisation for untrusted free-text values
//! --------------------------------------------------
//! Any free-text value that will be echoed into rendered output or forwarded
//! as a request payload passes through here first. Strings have the six
//! HTML-significant characters escaped; everything else passes through
//! unchanged. Sanitisation is applied exactly once, immediately before
//! transmission: re-sanitising an already escaped string double-escapes the
//! ampersands of its entities.

use serde_json::Value;

/// Escape `&`, `<`, `>`, `"`, `'` and `/` to their entity forms.
///
/// A single left-to-right pass: each original ampersand is escaped before any
/// entity produced by a later substitution could be corrupted, and produced
/// entities are never re-scanned.
pub fn sanitize_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Sanitize a JSON value. Strings are escaped; numbers, booleans, nulls,
/// arrays and objects are returned unchanged (pass-through, not coercion).
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(s)),
        other => other.clone(),
    }
}
