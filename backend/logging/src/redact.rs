//! Log Redaction Layer
//!
//! Hook options routinely carry credentials (download tokens, registry
//! passwords). Everything that reaches a log goes through here first.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)|(gh[pousr]_[A-Za-z0-9]{20,})").unwrap()
});
static URL_CREDENTIALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*://)[^/\s:@]+:[^/\s@]+@").unwrap());

static SENSITIVE_KEYS: &[&str] = &[
    "apikey",
    "api_key",
    "token",
    "access_token",
    "accesstoken",
    "auth",
    "authorization",
    "secret",
    "password",
    "passphrase",
    "private_key",
    "privatekey",
];

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    URL_CREDENTIALS_RE
        .replace_all(&redacted, "${scheme}[REDACTED_CREDENTIALS]@")
        .into_owned()
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Copy of a hook's options safe to log: values under sensitive keys become
/// `"***"`, every other string is scrubbed with [`redact_sensitive_data`].
pub fn redact_options(options: &Value) -> Value {
    redact_recursive(options, false)
}

fn redact_recursive(value: &Value, masked: bool) -> Value {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) if masked => Value::String("***".into()),
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, masked)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, masked || is_sensitive_key(k))))
                .collect(),
        ),
        other => other.clone(),
    }
}
