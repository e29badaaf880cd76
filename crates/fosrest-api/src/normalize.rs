// Response normalization
//
// The switch reports the same logical outcome in several shapes depending
// on release and platform: empty collections arrive as 404 or as an error
// about an empty database, a PATCH with nothing to change comes back as a
// 400, a single record is an object where a list is expected. Everything
// here collapses those into one `Envelope` so callers never special-case
// device quirks.
//
// Pure: normalizing the same raw response twice gives the same envelope,
// which is what lets a recorded trace be replayed faithfully.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::Method;

// ── Raw response ─────────────────────────────────────────────────────

/// Untouched HTTP result as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Device `error-message` entries joined with `"; "`, or the reason
    /// phrase when the body carries none.
    pub fn error_message(&self) -> String {
        let messages = parse_errors(&self.body)
            .iter()
            .filter_map(|e| e.get("error-message").and_then(Value::as_str))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if messages.is_empty() {
            self.reason.clone()
        } else {
            messages.join("; ")
        }
    }

    /// Device error code from the first error entry: `error-info/error-code`
    /// when present, else `error-tag`.
    fn device_code(&self) -> Option<String> {
        let errors = parse_errors(&self.body);
        let first = errors.first()?;
        let code = first
            .get("error-info")
            .and_then(|info| info.get("error-code"))
            .or_else(|| first.get("error-tag"))?;
        match code {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// `errors.error` as a list. Releases up to 8.2.1a send a single object.
fn parse_errors(body: &str) -> Vec<Value> {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    match json.pointer("/errors/error") {
        Some(Value::Array(items)) => items.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

// ── Envelope ─────────────────────────────────────────────────────────

/// Canonical result of one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Envelope {
    /// One or more records. Never empty.
    Success(Vec<Value>),
    /// Completed with nothing to return.
    EmptySuccess,
    /// The device rejected the request.
    Error(DeviceError),
}

impl Envelope {
    /// Records carried by a success. Empty for `EmptySuccess` and `Error`.
    pub fn payload(&self) -> &[Value] {
        match self {
            Self::Success(records) => records,
            Self::EmptySuccess | Self::Error(_) => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn error(&self) -> Option<&DeviceError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Consume the envelope, turning a device error into `Err`.
    pub fn into_result(self) -> Result<Vec<Value>, DeviceError> {
        match self {
            Self::Success(records) => Ok(records),
            Self::EmptySuccess => Ok(Vec::new()),
            Self::Error(e) => Err(e),
        }
    }
}

/// Error reported by the device, with the response kept for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DeviceError {
    pub code: ErrorCode,
    pub message: String,
    pub raw: RawResponse,
}

/// Where an error code came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Code supplied by the device in the error body.
    Device(String),
    /// No device code; the HTTP status is all there is.
    Http(u16),
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device(code) => write!(f, "device error {code}"),
            Self::Http(status) => write!(f, "HTTP {status}"),
        }
    }
}

// ── No-op rules ──────────────────────────────────────────────────────

/// A non-2xx outcome that actually means "nothing to report".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoOpRule {
    pub method: Method,
    pub status: u16,
    /// Substring of the device message that must be present. `None`
    /// matches on method and status alone.
    pub message_contains: Option<Cow<'static, str>>,
}

impl NoOpRule {
    pub const fn new(method: Method, status: u16, message_contains: &'static str) -> Self {
        Self {
            method,
            status,
            message_contains: Some(Cow::Borrowed(message_contains)),
        }
    }

    pub const fn any_message(method: Method, status: u16) -> Self {
        Self {
            method,
            status,
            message_contains: None,
        }
    }

    fn matches(&self, method: Method, raw: &RawResponse, message: &str) -> bool {
        self.method == method
            && self.status == raw.status
            && self
                .message_contains
                .as_deref()
                .is_none_or(|needle| message.contains(needle))
    }
}

/// Rules every supported release needs.
pub const DEFAULT_NO_OP_RULES: &[NoOpRule] = &[
    // Empty list reported as not found.
    NoOpRule::any_message(Method::Get, 404),
    NoOpRule::new(Method::Get, 400, "No entries in the FDMI database"),
    NoOpRule::new(Method::Get, 400, "Not supported on this platform"),
    NoOpRule::new(Method::Patch, 400, "No Change in Configuration"),
    NoOpRule::new(Method::Patch, 400, "Same configuration"),
];

// ── Normalizer ───────────────────────────────────────────────────────

/// Maps raw responses to envelopes.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Vec<NoOpRule>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            rules: DEFAULT_NO_OP_RULES.to_vec(),
        }
    }
}

impl Normalizer {
    /// A normalizer with no no-op rules: every non-2xx is an error.
    pub fn strict() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: NoOpRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[NoOpRule] {
        &self.rules
    }

    pub fn normalize(&self, method: Method, collection_key: &str, raw: &RawResponse) -> Envelope {
        if raw.is_success() {
            return normalize_success(collection_key, raw);
        }

        let message = raw.error_message();
        if self
            .rules
            .iter()
            .any(|rule| rule.matches(method, raw, &message))
        {
            return Envelope::EmptySuccess;
        }

        let code = raw
            .device_code()
            .map_or(ErrorCode::Http(raw.status), ErrorCode::Device);
        Envelope::Error(DeviceError {
            code,
            message,
            raw: raw.clone(),
        })
    }
}

fn normalize_success(collection_key: &str, raw: &RawResponse) -> Envelope {
    if raw.body.trim().is_empty() {
        return Envelope::EmptySuccess;
    }

    let json: Value = match serde_json::from_str(&raw.body) {
        Ok(json) => json,
        Err(_) => {
            return Envelope::Error(DeviceError {
                code: ErrorCode::Http(raw.status),
                message: "invalid data".to_owned(),
                raw: raw.clone(),
            });
        }
    };

    let Some(response) = json.get("Response") else {
        return Envelope::EmptySuccess;
    };

    let records = match response {
        Value::Object(map) => match map.get(collection_key) {
            Some(found) => found,
            None if map.len() == 1 => map.values().next().unwrap_or(response),
            None => response,
        },
        other => other,
    };

    match records {
        Value::Null => Envelope::EmptySuccess,
        Value::Array(items) if items.is_empty() => Envelope::EmptySuccess,
        Value::Object(map) if map.is_empty() => Envelope::EmptySuccess,
        Value::Array(items) => Envelope::Success(items.clone()),
        other => Envelope::Success(vec![other.clone()]),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn ok(body: Value) -> RawResponse {
        RawResponse::new(200, "OK", body.to_string())
    }

    fn error_body(message: &str) -> String {
        json!({
            "errors": {
                "error": [{
                    "error-type": "application",
                    "error-tag": "invalid-value",
                    "error-message": message,
                    "error-path": "/rest/running",
                    "error-info": {"error-code": -1, "error-module": "zone"}
                }]
            }
        })
        .to_string()
    }

    #[test]
    fn single_object_becomes_one_element_sequence() {
        let raw = ok(json!({"Response": {"fibrechannel": {"name": "0/1"}}}));
        let env = Normalizer::default().normalize(Method::Get, "fibrechannel", &raw);
        assert_eq!(env, Envelope::Success(vec![json!({"name": "0/1"})]));
    }

    #[test]
    fn array_is_passed_through() {
        let raw = ok(json!({"Response": {"fibrechannel": [{"name": "0/1"}, {"name": "0/2"}]}}));
        let env = Normalizer::default().normalize(Method::Get, "fibrechannel", &raw);
        assert_eq!(env.payload().len(), 2);
    }

    #[test]
    fn empty_shapes_are_empty_success() {
        let n = Normalizer::default();
        for body in [
            json!({"Response": {"fibrechannel": []}}),
            json!({"Response": {"fibrechannel": {}}}),
            json!({"Response": {"fibrechannel": null}}),
            json!({"Response": {}}),
            json!({"Response": null}),
            json!({"output": "ignored"}),
        ] {
            let env = n.normalize(Method::Get, "fibrechannel", &ok(body.clone()));
            assert_eq!(env, Envelope::EmptySuccess, "body {body}");
            assert!(env.payload().is_empty());
        }
        let env = n.normalize(Method::Patch, "chassis", &RawResponse::new(204, "No Content", ""));
        assert_eq!(env, Envelope::EmptySuccess);
    }

    #[test]
    fn single_child_is_used_when_key_differs() {
        let raw = ok(json!({"Response": {"show-status": {"status": "done"}}}));
        let env = Normalizer::default().normalize(Method::Post, "operations", &raw);
        assert_eq!(env.payload(), &[json!({"status": "done"})]);
    }

    #[test]
    fn non_json_success_is_invalid_data() {
        let raw = RawResponse::new(200, "OK", "<html>oops</html>");
        let env = Normalizer::default().normalize(Method::Get, "chassis", &raw);
        let err = env.error().unwrap();
        assert_eq!(err.code, ErrorCode::Http(200));
        assert_eq!(err.message, "invalid data");
    }

    #[test]
    fn default_no_op_rules() {
        let n = Normalizer::default();
        let cases = [
            (Method::Get, RawResponse::new(404, "Not Found", "")),
            (
                Method::Get,
                RawResponse::new(400, "Bad Request", error_body("No entries in the FDMI database")),
            ),
            (
                Method::Get,
                RawResponse::new(
                    400,
                    "Bad Request",
                    error_body("Fabric Watch: Not supported on this platform"),
                ),
            ),
            (
                Method::Patch,
                RawResponse::new(400, "Bad Request", error_body("No Change in Configuration")),
            ),
            (
                Method::Patch,
                RawResponse::new(400, "Bad Request", error_body("Same configuration")),
            ),
        ];
        for (method, raw) in cases {
            assert_eq!(
                n.normalize(method, "x", &raw),
                Envelope::EmptySuccess,
                "{method} {}",
                raw.body
            );
        }
    }

    #[test]
    fn no_op_rules_are_method_specific() {
        let n = Normalizer::default();
        let raw = RawResponse::new(404, "Not Found", "");
        assert!(n.normalize(Method::Delete, "x", &raw).is_error());

        let raw = RawResponse::new(400, "Bad Request", error_body("No Change in Configuration"));
        assert!(n.normalize(Method::Get, "x", &raw).is_error());
    }

    #[test]
    fn device_error_code_and_message() {
        let raw = RawResponse::new(400, "Bad Request", error_body("Zone name already exists"));
        let env = Normalizer::default().normalize(Method::Post, "defined-configuration", &raw);
        let err = env.error().unwrap();
        assert_eq!(err.code, ErrorCode::Device("-1".into()));
        assert_eq!(err.message, "Zone name already exists");
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn legacy_single_error_object() {
        let body = json!({
            "errors": {"error": {"error-tag": "access-denied", "error-message": "Denied"}}
        });
        let raw = RawResponse::new(403, "Forbidden", body.to_string());
        let err = Normalizer::default()
            .normalize(Method::Get, "x", &raw)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Device("access-denied".into()));
        assert_eq!(err.message, "Denied");
    }

    #[test]
    fn multiple_errors_are_joined() {
        let body = json!({
            "errors": {"error": [{"error-message": "first"}, {"error-message": "second"}]}
        });
        let raw = RawResponse::new(400, "Bad Request", body.to_string());
        let err = Normalizer::default().normalize(Method::Patch, "x", &raw);
        assert_eq!(err.error().unwrap().message, "first; second");
        assert_eq!(err.error().unwrap().code, ErrorCode::Http(400));
    }

    #[test]
    fn reason_phrase_is_the_fallback_message() {
        let raw = RawResponse::new(500, "Internal Server Error", "");
        let err = Normalizer::strict().normalize(Method::Get, "x", &raw);
        assert_eq!(err.error().unwrap().message, "Internal Server Error");
    }

    #[test]
    fn custom_rule_extends_defaults() {
        let n = Normalizer::default().with_rule(NoOpRule::new(
            Method::Delete,
            400,
            "does not exist",
        ));
        let raw = RawResponse::new(400, "Bad Request", error_body("Alias does not exist"));
        assert_eq!(n.normalize(Method::Delete, "alias", &raw), Envelope::EmptySuccess);
        assert_eq!(n.rules().len(), DEFAULT_NO_OP_RULES.len() + 1);
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = Normalizer::default();
        let raw = RawResponse::new(400, "Bad Request", error_body("boom"));
        assert_eq!(
            n.normalize(Method::Get, "x", &raw),
            n.normalize(Method::Get, "x", &raw)
        );
    }

    #[test]
    fn envelope_serde_shape() {
        let json = serde_json::to_value(Envelope::EmptySuccess).unwrap();
        assert_eq!(json, json!({"kind": "empty_success"}));
        let json = serde_json::to_value(Envelope::Success(vec![json!(1)])).unwrap();
        assert_eq!(json, json!({"kind": "success", "data": [1]}));
    }
}
