use serde_json::Value;

/// Shorten `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Recursively shorten every string inside a JSON value. Used to keep chat
/// transcripts readable in dashboard previews.
pub fn truncate_strings(val: &Value, max_chars: usize) -> Value {
    match val {
        Value::String(s) => Value::String(truncate_text(s, max_chars)),
        Value::Array(arr) => Value::Array(
            arr.iter()
                .map(|v| truncate_strings(v, max_chars))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_strings(v, max_chars)))
                .collect(),
        ),
        _ => val.clone(),
    }
}
