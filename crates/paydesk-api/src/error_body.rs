// Extraction of human-readable messages from backend error bodies.
//
// The payments backend answers failures with one of:
//   {"detail": "Authentication credentials were not provided."}
//   {"code": ["This field is required."], "nom": ["Too long."]}
//   {"non_field_errors": ["..."]}
// and occasionally a bare string or an HTML page from a proxy.

use serde_json::Value;

const PREVIEW_LEN: usize = 200;

/// Pull display messages out of a raw error body.
///
/// Returns an empty vec when nothing usable is found; callers fall back to
/// a generic message in that case.
pub fn extract_messages(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => messages_from_value(&value),
        Err(_) if trimmed.starts_with('<') => Vec::new(),
        Err(_) => vec![preview(trimmed)],
    }
}

/// Same as [`extract_messages`] for an already-parsed body.
pub fn messages_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::Object(map) => {
            for key in ["detail", "message", "error"] {
                if let Some(text) = map.get(key).and_then(scalar_text) {
                    return vec![text];
                }
            }

            let mut out = Vec::new();
            if let Some(Value::Array(items)) = map.get("non_field_errors") {
                out.extend(items.iter().filter_map(scalar_text));
            }
            for (field, v) in map {
                if field == "non_field_errors" {
                    continue;
                }
                collect_field(field, v, &mut out);
            }
            out
        }
        _ => Vec::new(),
    }
}

fn collect_field(field: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_field(field, item, out);
            }
        }
        Value::Object(nested) => {
            for (sub, v) in nested {
                collect_field(&format!("{field}.{sub}"), v, out);
            }
        }
        other => {
            if let Some(text) = scalar_text(other) {
                out.push(format!("{field}: {text}"));
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_LEN {
        return text.to_owned();
    }
    let cut: String = text.chars().take(PREVIEW_LEN).collect();
    format!("{cut}…")
}
