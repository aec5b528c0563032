//! Receivers for provider-initiated notifications.
//!
//! Result callbacks and instant payment notifications are answered locally;
//! nothing is forwarded upstream.

use serde_json::Value;

use crate::{
    error::{GatewayError, Result},
    normalize::NormalizedResponse,
};

/// Fields every IPN must carry.
pub const IPN_REQUIRED_FIELDS: [&str; 8] = [
    "MerchantCode",
    "PaymentMethod",
    "TransID",
    "TransAmount",
    "TransactionType",
    "MSISDN",
    "TransTime",
    "BillRefNumber",
];

/// Acknowledges a payment result callback.
///
/// The acknowledgement itself always succeeds; the message reports whether
/// the provider's `ResultCode` (`"0"` or `0`) marks the payment successful.
///
/// # Examples
///
/// ```
/// use paygate_bridge::provider::callback::acknowledge_callback;
/// use serde_json::json;
///
/// let response = acknowledge_callback(json!({"ResultCode": "1032", "ResultDesc": "Cancelled by user"}));
/// assert!(response.status);
/// assert_eq!(response.message, "Transaction failed: Cancelled by user");
/// ```
#[must_use]
pub fn acknowledge_callback(body: Value) -> NormalizedResponse {
    let message = if is_success_code(body.get("ResultCode")) {
        "Transaction processed successfully.".to_owned()
    } else {
        let reason = body.get("ResultDesc").and_then(Value::as_str).unwrap_or("no description provided");
        format!("Transaction failed: {reason}")
    };
    NormalizedResponse::success(200, message, body)
}

/// Accepts an instant payment notification.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] if the body is not an object or
/// lacks any of [`IPN_REQUIRED_FIELDS`].
pub fn accept_ipn(body: Value) -> Result<NormalizedResponse> {
    let Some(fields) = body.as_object() else {
        return Err(GatewayError::Validation("request body must be a JSON object".into()));
    };

    let missing: Vec<&str> =
        IPN_REQUIRED_FIELDS.into_iter().filter(|field| !fields.contains_key(*field)).collect();
    if !missing.is_empty() {
        return Err(GatewayError::Validation(format!("Missing fields: {}", missing.join(", "))));
    }

    Ok(NormalizedResponse::success(200, "IPN received successfully", body))
}

fn is_success_code(code: Option<&Value>) -> bool {
    match code {
        Some(Value::String(text)) => text.trim() == "0",
        Some(Value::Number(number)) => number.as_i64() == Some(0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn complete_ipn() -> Value {
        json!({
            "MerchantCode": "600980",
            "PaymentMethod": "M-PESA",
            "TransID": "RJ4HX1",
            "TransAmount": "10.00",
            "TransactionType": "C2B",
            "MSISDN": "254700000000",
            "TransTime": "20240304050607",
            "BillRefNumber": "INV-1"
        })
    }

    #[test]
    fn test_callback_success_code_string_and_number() {
        for code in [json!("0"), json!(0)] {
            let response = acknowledge_callback(json!({"ResultCode": code}));
            assert!(response.status);
            assert_eq!(response.http_status, 200);
            assert_eq!(response.message, "Transaction processed successfully.");
        }
    }

    #[test]
    fn test_callback_failure_reports_description_and_keeps_body() {
        let body = json!({"ResultCode": 1, "ResultDesc": "Insufficient funds", "TransAmount": "5"});
        let response = acknowledge_callback(body.clone());
        assert!(response.status);
        assert_eq!(response.message, "Transaction failed: Insufficient funds");
        assert_eq!(response.data, body);
    }

    #[test]
    fn test_callback_without_result_code_is_failure() {
        let response = acknowledge_callback(json!({}));
        assert_eq!(response.message, "Transaction failed: no description provided");
    }

    #[test]
    fn test_ipn_accepts_complete_body() {
        let response = accept_ipn(complete_ipn()).unwrap();
        assert!(response.status);
        assert_eq!(response.message, "IPN received successfully");
        assert_eq!(response.data["TransID"], "RJ4HX1");
    }

    #[test]
    fn test_ipn_lists_missing_fields_in_order() {
        let mut body = complete_ipn();
        let fields = body.as_object_mut().unwrap();
        fields.remove("TransID");
        fields.remove("MSISDN");

        let err = accept_ipn(body).unwrap_err();
        assert_eq!(err.to_string(), "Missing fields: TransID, MSISDN");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_ipn_null_value_counts_as_present() {
        let mut body = complete_ipn();
        body["BillRefNumber"] = Value::Null;
        assert!(accept_ipn(body).is_ok());
    }

    #[test]
    fn test_ipn_rejects_non_object() {
        assert!(accept_ipn(json!("text")).is_err());
    }
}
