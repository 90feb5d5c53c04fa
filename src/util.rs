//! Response-body helpers shared by the API clients.

use serde_json::Value;

/// True when a body looks like an XML or HTML document rather than JSON.
///
/// Object-storage errors and load-balancer pages come back this way when the
/// configured host is not the Launch API.
pub fn looks_like_markup(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with("<?xml")
        || trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || body.contains("<Error>")
}

/// Pull a human-readable message out of an error body.
///
/// Tries `error_description`, `error`, then `message` on a JSON object and
/// falls back to the raw (trimmed) text. Returns `None` for empty bodies.
pub fn error_message_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        for key in ["error_description", "error", "message"] {
            match map.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
                Some(Value::Null) | None => continue,
                Some(Value::String(_)) => continue,
                Some(other) => return Some(other.to_string()),
            }
        }
    }
    Some(truncate(trimmed, 500))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
