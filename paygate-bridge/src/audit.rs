//! Audit logging for security-relevant gateway events.
//!
//! Token issuance, provider calls, local validation rejections and inbound
//! provider notifications are recorded as structured events on the
//! `"audit"` tracing target so they can be routed separately from
//! operational logs. Every event carries a correlation id, which is the
//! outbound `X-Trace-Id` whenever the event belongs to a provider call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A provider minted a new access token.
    TokenIssued,
    /// The provider token endpoint failed or answered with a malformed body.
    TokenIssuanceFailed,
    /// A provider call completed and the provider reported success.
    ProviderCallSucceeded,
    /// A provider call failed (HTTP, in-body or transport failure).
    ProviderCallFailed,
    /// Caller input was rejected before any provider call.
    ValidationRejected,
    /// A transaction result callback arrived from a provider.
    CallbackReceived,
    /// An instant payment notification arrived from a provider.
    IpnReceived,
}

/// Contextual details attached to an [`AuditEvent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Endpoint operation id (e.g. `stk_push`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// HTTP status returned by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Provider or caller reference (bill reference, transaction id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Error message, redacted on insertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration of the operation in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Audit log entry.
///
/// # Examples
///
/// ```
/// use paygate_bridge::audit::{AuditEvent, AuditEventType, audit_log};
/// use uuid::Uuid;
///
/// let event = AuditEvent::new(AuditEventType::ProviderCallFailed, "mpesa", Uuid::new_v4())
///     .with_operation("stk_push")
///     .with_upstream_status(500)
///     .with_error("request for 254712345678 rejected");
///
/// assert!(!event.details.error.as_deref().unwrap_or_default().contains("254712345678"));
/// audit_log(&event);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub event_type: AuditEventType,
    /// Provider the event belongs to.
    pub provider: String,
    /// Correlation id.
    pub request_id: Uuid,
    /// Event details.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates a new audit event stamped with the current time.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(event_type: AuditEventType, provider: impl Into<String>, request_id: Uuid) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            provider: provider.into(),
            request_id,
            details: AuditDetails::default(),
        }
    }

    /// Adds the endpoint operation id.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.details.operation = Some(operation.into());
        self
    }

    /// Adds the provider HTTP status.
    #[must_use]
    pub const fn with_upstream_status(mut self, status: u16) -> Self {
        self.details.upstream_status = Some(status);
        self
    }

    /// Adds a reference, masking phone-number and card-number digits.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.details.reference = Some(redact_sensitive(&reference.into()));
        self
    }

    /// Adds an error message. Sensitive data is redacted automatically.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.details.error = Some(redact_sensitive(&error.into()));
        self
    }

    /// Adds the operation duration.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "duration in ms fits u64 for practical values"
    )]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.details.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

/// Logs an audit event to tracing with target `"audit"`.
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = %event.timestamp.to_rfc3339(),
        event_type = ?event.event_type,
        provider = %event.provider,
        request_id = %event.request_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Digit count at or above which a digit run is masked as a card number.
const CARD_MIN_DIGITS: usize = 13;
/// Digit count at or above which a digit run is masked as a phone number.
const MSISDN_MIN_DIGITS: usize = 9;

/// Redacts card numbers, phone numbers and CVV codes from free text.
///
/// Digit runs may contain single spaces or dashes between groups
/// (`4111 1111 1111 1111`, `+254-712-345-678`).
///
/// - 13 or more digits: every digit except the last four becomes `X`
/// - 9 to 12 digits (MSISDN): every digit except the last three becomes `X`
/// - `cvv`/`cvc` followed by 3-4 digits: the digits become `XXX`
///
/// Shorter runs such as amounts and result codes are left alone.
///
/// # Examples
///
/// ```
/// use paygate_bridge::audit::redact_sensitive;
///
/// assert_eq!(redact_sensitive("card 4111111111111111"), "card XXXXXXXXXXXX1111");
/// assert_eq!(redact_sensitive("to 254712345678"), "to XXXXXXXXX678");
/// assert_eq!(redact_sensitive("amount 100"), "amount 100");
/// ```
#[must_use]
pub fn redact_sensitive(input: &str) -> String {
    redact_cvv(&redact_digit_runs(input))
}

fn redact_digit_runs(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        // Extend over digits joined by single separators.
        let start = i;
        let mut end = i;
        while end < chars.len() {
            if chars[end].is_ascii_digit() {
                end += 1;
            } else if matches!(chars[end], ' ' | '-')
                && chars.get(end + 1).is_some_and(char::is_ascii_digit)
            {
                end += 1;
            } else {
                break;
            }
        }

        let run = &chars[start..end];
        let digits = run.iter().filter(|c| c.is_ascii_digit()).count();
        let visible = if digits >= CARD_MIN_DIGITS {
            4
        } else if digits >= MSISDN_MIN_DIGITS {
            3
        } else {
            digits
        };

        let mut seen = 0;
        for &c in run {
            if c.is_ascii_digit() {
                seen += 1;
                out.push(if seen + visible > digits { c } else { 'X' });
            } else {
                out.push(c);
            }
        }
        i = end;
    }
    out
}

fn redact_cvv(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let lower: Vec<char> = chars.iter().map(char::to_ascii_lowercase).collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let keyword =
            lower[i..].starts_with(&['c', 'v', 'v']) || lower[i..].starts_with(&['c', 'v', 'c']);
        if !keyword {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let mut j = i + 3;
        while j < chars.len() && matches!(chars[j], ':' | '=' | ' ' | '"') {
            j += 1;
        }
        let digits = chars[j..].iter().take_while(|c| c.is_ascii_digit()).count();

        out.extend(&chars[i..j]);
        if (3..=4).contains(&digits) {
            out.push_str("XXX");
            i = j + digits;
        } else {
            i = j;
        }
    }
    out
}
