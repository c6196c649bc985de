//! Sensitive-field removal.
//!
//! Deny-listed keys are removed from payloads, not masked: a redacted
//! response must not contain the key at all, at any nesting depth.

use serde_json::Value;

/// Fields stripped from every payload when `filter_sensitive_data` is on.
/// `*wrapped*` entries match any key containing the word, case-insensitive;
/// bare entries match the whole key, case-insensitive.
pub const DENY_LIST: &[&str] = &[
    "uid",
    "resourceVersion",
    "managedFields",
    "ownerReferences",
    "*token*",
    "*secret*",
    "*password*",
];

fn is_denied(key: &str, deny: &[&str]) -> bool {
    deny.iter().any(|pattern| {
        match pattern
            .strip_prefix('*')
            .and_then(|rest| rest.strip_suffix('*'))
        {
            Some(word) => key.to_ascii_lowercase().contains(word),
            None => key.eq_ignore_ascii_case(pattern),
        }
    })
}

/// Remove every deny-listed key from `value`, recursively.
pub fn redact(value: &mut Value, deny: &[&str]) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !is_denied(key, deny));
            for child in map.values_mut() {
                redact(child, deny);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact(item, deny);
            }
        }
        _ => {}
    }
}
