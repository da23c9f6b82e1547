//! Redaction of sensitive fields before any payload reaches a log line.

use serde_json::Value;

/// Field names that must never appear in plaintext in diagnostics.
const DENYLIST: &[&str] = &[
    "apiKey",
    "secretKey",
    "cardNumber",
    "cardCvv",
    "identityNumber",
];

const MASK: &str = "***MASKED***";

/// Maximum token prefix retained in logs; the rest is elided.
const TOKEN_LOG_PREFIX: usize = 20;

/// Return a copy of `value` safe to log: denylisted fields are masked at any
/// nesting depth, checkout form HTML is dropped, and tokens are truncated to
/// a short prefix.
pub fn redact_payload(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                let redacted = if DENYLIST.contains(&key.as_str()) {
                    Value::String(MASK.to_string())
                } else if key == "checkoutFormContent" {
                    Value::String("***HTML_CONTENT***".to_string())
                } else if key == "token" {
                    truncate_token(val)
                } else {
                    redact_payload(val)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_payload).collect()),
        other => other.clone(),
    }
}

fn truncate_token(value: &Value) -> Value {
    // Truncation is by character so multi-byte tokens never split mid-char.
    match value.as_str() {
        Some(s) => match s.char_indices().nth(TOKEN_LOG_PREFIX) {
            Some((boundary, _)) => Value::String(format!("{}...", &s[..boundary])),
            None => value.clone(),
        },
        None => value.clone(),
    }
}
