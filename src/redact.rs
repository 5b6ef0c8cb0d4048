//! Scrubbing of sensitive request fields before storage
//!
//! Redaction is a pure transform applied by the producer before an entry
//! is queued, so both the full payload and the minimal list-view
//! projection are derived from the same masked view. Header matching is
//! case-insensitive (keys are normalized to lowercase); body fields match
//! exactly.

use serde_json::{Map, Value};

/// Fixed token written over redacted values
pub const MASK: &str = "*******";

const DEFAULT_HIDDEN_HEADERS: &[&str] = &["authorization", "basic"];
const DEFAULT_HIDDEN_BODY_FIELDS: &[&str] = &[
    "password",
    "passwordConfirmation",
    "secret",
    "password_confirmation",
];

/// Which header and body-field names get masked.
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    hidden_headers: Vec<String>,
    hidden_body_fields: Vec<String>,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl RedactionPolicy {
    /// Build a policy from configured lists. An empty list falls back to
    /// the defaults rather than disabling redaction.
    pub fn new(hidden_headers: Vec<String>, hidden_body_fields: Vec<String>) -> Self {
        let hidden_headers = if hidden_headers.is_empty() {
            DEFAULT_HIDDEN_HEADERS.iter().map(|s| s.to_string()).collect()
        } else {
            hidden_headers
        };
        let hidden_body_fields = if hidden_body_fields.is_empty() {
            DEFAULT_HIDDEN_BODY_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            hidden_body_fields
        };

        Self {
            // Lowercased once here so header matching is case-insensitive
            // no matter how the config spells them.
            hidden_headers: hidden_headers
                .into_iter()
                .map(|h| h.to_lowercase())
                .collect(),
            hidden_body_fields,
        }
    }

    /// Redact a request payload: normalizes `headers` (and
    /// `response.headers`, when present) to lowercase keys and masks the
    /// configured names, then masks configured body fields.
    ///
    /// Returns a new value; the input is never mutated. Absent or
    /// non-object headers become an empty object; a non-object body
    /// passes through untouched. Applying the policy twice yields the
    /// same result as applying it once.
    pub fn redact_request(&self, data: &Value) -> Value {
        let mut out = data.clone();

        if let Value::Object(map) = &mut out {
            let masked = self.mask_headers(normalize_headers(map.get("headers")));
            map.insert("headers".to_string(), masked);

            if let Some(Value::Object(response)) = map.get_mut("response") {
                let masked = self.mask_headers(normalize_headers(response.get("headers")));
                response.insert("headers".to_string(), masked);
            }

            if let Some(Value::Object(body)) = map.get_mut("body") {
                for field in &self.hidden_body_fields {
                    if body.contains_key(field) {
                        body.insert(field.clone(), Value::String(MASK.to_string()));
                    }
                }
            }
        }

        out
    }

    fn mask_headers(&self, mut headers: Map<String, Value>) -> Value {
        for name in &self.hidden_headers {
            if headers.contains_key(name) {
                headers.insert(name.clone(), Value::String(MASK.to_string()));
            }
        }
        Value::Object(headers)
    }
}

/// Lowercase every header key. Anything that is not a JSON object
/// (missing, null, a string...) collapses to an empty map.
fn normalize_headers(headers: Option<&Value>) -> Map<String, Value> {
    match headers {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_default_headers_case_insensitively() {
        let policy = RedactionPolicy::default();
        let data = json!({
            "method": "POST",
            "headers": { "Authorization": "Bearer xyz", "Accept": "application/json" },
        });

        let redacted = policy.redact_request(&data);

        assert_eq!(redacted["headers"]["authorization"], MASK);
        assert_eq!(redacted["headers"]["accept"], "application/json");
        // Input is untouched
        assert_eq!(data["headers"]["Authorization"], "Bearer xyz");
    }

    #[test]
    fn masks_default_body_fields() {
        let policy = RedactionPolicy::default();
        let data = json!({
            "headers": {},
            "body": { "email": "a@b.c", "password": "hunter2", "secret": "s3" },
        });

        let redacted = policy.redact_request(&data);

        assert_eq!(redacted["body"]["password"], MASK);
        assert_eq!(redacted["body"]["secret"], MASK);
        assert_eq!(redacted["body"]["email"], "a@b.c");
    }

    #[test]
    fn masks_response_headers_too() {
        let policy = RedactionPolicy::default();
        let data = json!({
            "headers": {},
            "response": { "status": 200, "headers": { "AUTHORIZATION": "token" } },
        });

        let redacted = policy.redact_request(&data);
        assert_eq!(redacted["response"]["headers"]["authorization"], MASK);
    }

    #[test]
    fn absent_headers_become_empty_object() {
        let policy = RedactionPolicy::default();
        let redacted = policy.redact_request(&json!({ "method": "GET" }));
        assert_eq!(redacted["headers"], json!({}));
    }

    #[test]
    fn non_object_body_passes_through() {
        let policy = RedactionPolicy::default();
        let redacted = policy.redact_request(&json!({ "headers": {}, "body": "raw text" }));
        assert_eq!(redacted["body"], "raw text");
    }

    #[test]
    fn custom_lists_replace_defaults() {
        let policy = RedactionPolicy::new(
            vec!["X-Api-Key".to_string()],
            vec!["token".to_string()],
        );
        let data = json!({
            "headers": { "x-api-key": "k", "authorization": "still visible" },
            "body": { "token": "t", "password": "not hidden with custom list" },
        });

        let redacted = policy.redact_request(&data);

        assert_eq!(redacted["headers"]["x-api-key"], MASK);
        assert_eq!(redacted["headers"]["authorization"], "still visible");
        assert_eq!(redacted["body"]["token"], MASK);
        assert_eq!(redacted["body"]["password"], "not hidden with custom list");
    }

    #[test]
    fn redaction_is_idempotent() {
        let policy = RedactionPolicy::default();
        let data = json!({
            "headers": { "Authorization": "Bearer xyz" },
            "body": { "password": "hunter2" },
        });

        let once = policy.redact_request(&data);
        let twice = policy.redact_request(&once);
        assert_eq!(once, twice);
    }
}
