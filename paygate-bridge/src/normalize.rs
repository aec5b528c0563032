//! Provider response normalization.
//!
//! Every provider call ends here. The provider's HTTP status and JSON body
//! (or the transport failure that prevented one) are folded into the single
//! outward envelope:
//!
//! ```json
//! {"status": true, "message": "STK Push sent successfully.", "data": {...}}
//! ```
//!
//! The outcome is first interpreted into a typed [`Result`] so callers can use
//! `?`; [`From<GatewayError>`](NormalizedResponse#impl-From<GatewayError>-for-NormalizedResponse)
//! is the one place where errors become envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Body fields consulted, in order, for a provider-supplied message.
pub const MESSAGE_KEYS: [&str; 5] =
    ["message", "detail", "ResultDesc", "ResponseDescription", "errorMessage"];

/// The outward `{status, message, data}` envelope plus the HTTP status to send it with.
///
/// `http_status` is not part of the serialized body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    /// True iff the provider call succeeded at both the HTTP and body level.
    pub status: bool,
    /// Provider message, or a generic per-endpoint message.
    pub message: String,
    /// Full provider body, or `null`.
    pub data: Value,
    /// Status code for the outward HTTP response.
    #[serde(skip)]
    pub http_status: u16,
}

impl NormalizedResponse {
    /// Builds a successful envelope.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn success(http_status: u16, message: impl Into<String>, data: Value) -> Self {
        Self { status: true, message: message.into(), data, http_status }
    }

    /// Builds a failed envelope.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn failure(http_status: u16, message: impl Into<String>, data: Value) -> Self {
        Self { status: false, message: message.into(), data, http_status }
    }
}

impl From<GatewayError> for NormalizedResponse {
    fn from(error: GatewayError) -> Self {
        let http_status = error.http_status();
        match error {
            GatewayError::Auth { message, body, .. }
            | GatewayError::Upstream { message, body, .. } => {
                Self::failure(http_status, message, body.unwrap_or(Value::Null))
            }
            other => Self::failure(http_status, other.to_string(), Value::Null),
        }
    }
}

/// Per-endpoint normalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseRules {
    /// Operation label used in transport failure messages (`"STK Push"`).
    pub label: &'static str,
    /// Message used on success when the body carries none.
    pub success_message: &'static str,
    /// Message used on failure when the body carries none.
    pub failure_message: &'static str,
    /// Body field whose falsy value signals failure despite a 2xx status.
    pub failure_field: Option<&'static str>,
}

/// Result of one outbound provider call.
#[derive(Debug)]
pub enum UpstreamOutcome {
    /// The provider answered.
    Response {
        /// HTTP status code.
        status: u16,
        /// Raw body bytes.
        body: Vec<u8>,
    },
    /// The provider could not be reached or the body could not be read.
    TransportFailure(String),
}

/// Folds an outcome into an envelope. Never fails.
///
/// # Examples
///
/// ```
/// use paygate_bridge::normalize::{ResponseRules, UpstreamOutcome, normalize};
///
/// let rules = ResponseRules {
///     label: "Create charge",
///     success_message: "Charge created successfully.",
///     failure_message: "Charge creation failed",
///     failure_field: Some("status"),
/// };
///
/// let outcome = UpstreamOutcome::Response { status: 404, body: br#"{"message":"not found"}"#.to_vec() };
/// let response = normalize(outcome, &rules);
/// assert!(!response.status);
/// assert_eq!(response.http_status, 404);
/// assert_eq!(response.message, "not found");
/// ```
#[must_use]
pub fn normalize(outcome: UpstreamOutcome, rules: &ResponseRules) -> NormalizedResponse {
    interpret(outcome, rules).unwrap_or_else(NormalizedResponse::from)
}

/// Interprets an outcome as a typed result.
///
/// # Errors
///
/// - [`GatewayError::Transport`] for a transport failure, or a 2xx body that
///   is not JSON
/// - [`GatewayError::Upstream`] for a non-2xx status or a falsy in-body
///   failure field
pub fn interpret(outcome: UpstreamOutcome, rules: &ResponseRules) -> Result<NormalizedResponse> {
    let (status, raw) = match outcome {
        UpstreamOutcome::Response { status, body } => (status, body),
        UpstreamOutcome::TransportFailure(reason) => {
            return Err(GatewayError::transport(rules.label, reason));
        }
    };

    let body = parse_body(&raw);
    let success = (200..300).contains(&status);

    if !success {
        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or(rules.failure_message)
            .to_owned();
        return Err(GatewayError::Upstream { status, message, body });
    }

    let Some(body) = body else {
        return Err(GatewayError::transport(rules.label, "provider returned a non-JSON body"));
    };

    if let Some(field) = rules.failure_field
        && body.get(field).is_some_and(is_falsy)
    {
        let message = extract_message(&body).unwrap_or(rules.failure_message).to_owned();
        return Err(GatewayError::Upstream { status, message, body: Some(body) });
    }

    let message = extract_message(&body).unwrap_or(rules.success_message).to_owned();
    Ok(NormalizedResponse::success(status, message, body))
}

/// Returns the first string field among [`MESSAGE_KEYS`].
#[must_use]
pub fn extract_message(body: &Value) -> Option<&str> {
    MESSAGE_KEYS.iter().find_map(|key| body.get(*key).and_then(Value::as_str))
}

/// Whether a provider success indicator signals failure.
///
/// A present `null`, JSON `false`, a zero number, a blank string, or one of
/// the strings `false`, `failed`, `error` in any case. An absent field is
/// never falsy.
#[must_use]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => {
            let text = text.trim();
            text.is_empty()
                || ["false", "failed", "error"]
                    .iter()
                    .any(|candidate| text.eq_ignore_ascii_case(candidate))
        }
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Parses a body; empty bodies become `null`, unparseable ones `None`.
fn parse_body(raw: &[u8]) -> Option<Value> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Some(Value::Null);
    }
    serde_json::from_slice(raw).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const RULES: ResponseRules = ResponseRules {
        label: "Payment request",
        success_message: "Payment request sent successfully.",
        failure_message: "Payment request failed.",
        failure_field: Some("status"),
    };

    const NO_FIELD: ResponseRules = ResponseRules { failure_field: None, ..RULES };

    fn response(status: u16, body: &Value) -> UpstreamOutcome {
        UpstreamOutcome::Response { status, body: serde_json::to_vec(body).unwrap() }
    }

    #[test]
    fn test_success_uses_body_message() {
        let body = json!({"message": "ok", "id": "c_1"});
        let normalized = normalize(response(200, &body), &RULES);

        assert!(normalized.status);
        assert_eq!(normalized.http_status, 200);
        assert_eq!(normalized.message, "ok");
        assert_eq!(normalized.data, body);
        assert_eq!(
            serde_json::to_value(&normalized).unwrap(),
            json!({"status": true, "message": "ok", "data": {"message": "ok", "id": "c_1"}})
        );
    }

    #[test]
    fn test_success_keeps_upstream_2xx_code() {
        let normalized = normalize(response(201, &json!({"id": 1})), &RULES);
        assert!(normalized.status);
        assert_eq!(normalized.http_status, 201);
        assert_eq!(normalized.message, "Payment request sent successfully.");
    }

    #[test]
    fn test_http_failure_passes_status_and_body() {
        let body = json!({"message": "not found"});
        let normalized = normalize(response(404, &body), &RULES);

        assert!(!normalized.status);
        assert_eq!(normalized.http_status, 404);
        assert_eq!(normalized.message, "not found");
        assert_eq!(normalized.data, body);
    }

    #[test]
    fn test_http_failure_without_message_uses_generic() {
        let normalized = normalize(response(502, &json!({"code": 7})), &RULES);
        assert_eq!(normalized.message, "Payment request failed.");
        assert_eq!(normalized.http_status, 502);
    }

    #[test]
    fn test_transport_failure() {
        let outcome = UpstreamOutcome::TransportFailure("connection refused".into());
        let normalized = normalize(outcome, &RULES);

        assert!(!normalized.status);
        assert_eq!(normalized.http_status, 500);
        assert_eq!(normalized.message, "Payment request failed: connection refused");
        assert_eq!(normalized.data, Value::Null);
    }

    #[test]
    fn test_in_body_failure_despite_200() {
        let body = json!({"status": false, "ResultDesc": "Insufficient funds"});
        let normalized = normalize(response(200, &body), &RULES);

        assert!(!normalized.status);
        assert_eq!(normalized.http_status, 200);
        assert_eq!(normalized.message, "Insufficient funds");
        assert_eq!(normalized.data, body);
    }

    #[test]
    fn test_in_body_field_ignored_when_provider_has_none() {
        let body = json!({"status": false, "ResultDesc": "Accepted"});
        let normalized = normalize(response(200, &body), &NO_FIELD);
        assert!(normalized.status);
    }

    #[test]
    fn test_truthy_status_field_is_success() {
        let body = json!({"status": true, "detail": "Request processed"});
        let normalized = normalize(response(200, &body), &RULES);
        assert!(normalized.status);
        assert_eq!(normalized.message, "Request processed");
    }

    #[test]
    fn test_non_json_failure_body_has_null_data() {
        let outcome = UpstreamOutcome::Response { status: 503, body: b"<html>down</html>".to_vec() };
        let normalized = normalize(outcome, &RULES);
        assert_eq!(normalized.http_status, 503);
        assert_eq!(normalized.message, "Payment request failed.");
        assert_eq!(normalized.data, Value::Null);
    }

    #[test]
    fn test_non_json_success_body_is_transport_failure() {
        let outcome = UpstreamOutcome::Response { status: 200, body: b"OK".to_vec() };
        let normalized = normalize(outcome, &RULES);
        assert!(!normalized.status);
        assert_eq!(normalized.http_status, 500);
        assert!(normalized.message.starts_with("Payment request failed:"));
    }

    #[test]
    fn test_empty_success_body_is_null_data() {
        let outcome = UpstreamOutcome::Response { status: 204, body: Vec::new() };
        let normalized = normalize(outcome, &RULES);
        assert!(normalized.status);
        assert_eq!(normalized.data, Value::Null);
    }

    #[test]
    fn test_message_key_precedence() {
        let body = json!({"errorMessage": "e", "detail": "d", "ResultDesc": "r"});
        assert_eq!(extract_message(&body), Some("d"));
        assert_eq!(extract_message(&json!({"message": 5})), None);
        assert_eq!(extract_message(&json!([1, 2])), None);
    }

    #[test]
    fn test_falsy_values() {
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!("FAILED")));
        assert!(is_falsy(&json!("error")));
        assert!(is_falsy(&json!("false")));
        assert!(!is_falsy(&json!(true)));
        assert!(!is_falsy(&json!("success")));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&Value::Null));
        assert!(is_falsy(&json!("")));
        assert!(is_falsy(&json!("  ")));
        assert!(!is_falsy(&json!(1)));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!([])));
    }

    #[test]
    fn test_null_zero_or_empty_status_is_failure_despite_200() {
        for status in [Value::Null, json!(0), json!("")] {
            let body = json!({"status": status, "message": "x"});
            let normalized = normalize(response(200, &body), &RULES);

            assert!(!normalized.status, "status {status} should signal failure");
            assert_eq!(normalized.http_status, 200);
            assert_eq!(normalized.message, "x");
            assert_eq!(normalized.data, body);
        }
    }

    #[test]
    fn test_absent_status_field_is_success() {
        let normalized = normalize(response(200, &json!({"message": "x"})), &RULES);
        assert!(normalized.status);
    }

    #[test]
    fn test_boundary_mapping() {
        let validation: NormalizedResponse =
            GatewayError::Validation("Missing required fields: amount".into()).into();
        assert_eq!(validation.http_status, 400);
        assert_eq!(validation.message, "Missing required fields: amount");
        assert_eq!(validation.data, Value::Null);

        let auth: NormalizedResponse = GatewayError::Auth {
            status: 401,
            message: "Invalid client".into(),
            body: Some(json!({"error": "invalid_client"})),
        }
        .into();
        assert_eq!(auth.http_status, 401);
        assert_eq!(auth.data, json!({"error": "invalid_client"}));

        let config: NormalizedResponse =
            GatewayError::Config("mpesa is not configured".into()).into();
        assert_eq!(config.http_status, 500);
        assert!(!config.status);
    }
}
