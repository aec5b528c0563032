//! Mobile-money gateway endpoints.

use serde_json::json;

use super::{Endpoint, Provider};
use crate::schema::{ContextValue, EndpointSchema, FieldSpec};

const P: Provider = Provider::Mpesa;

fn stk_push_schema() -> EndpointSchema {
    EndpointSchema::new(vec![
        FieldSpec::context("BusinessShortCode", ContextValue::ShortCode),
        FieldSpec::context("Password", ContextValue::Password),
        FieldSpec::context("Timestamp", ContextValue::Timestamp),
        FieldSpec::inbound("TransactionType").default_value(json!("CustomerPayBillOnline")),
        FieldSpec::inbound("Amount").required().amount(),
        FieldSpec::inbound("PartyA"),
        FieldSpec::inbound("PartyB").default_from(ContextValue::ShortCode),
        FieldSpec::inbound("PhoneNumber").required(),
        FieldSpec::inbound("CallBackURL").required(),
        FieldSpec::inbound("AccountReference"),
        FieldSpec::inbound("TransactionDesc"),
    ])
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::introspection(P, "/mpesa/auth"),
        Endpoint::post(P, "qr_code", "/mpesa/qr-code", "/mpesa/qrcode/v1/generate")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("MerchantName").required(),
                FieldSpec::inbound("RefNo").required(),
                FieldSpec::inbound("Amount").required().amount(),
                FieldSpec::inbound("TrxCode").required(),
                FieldSpec::inbound("CPI").required(),
                FieldSpec::inbound("Size"),
            ]))
            .messages("QR Code generation", "QR Code generated successfully.", "QR Code not generated"),
        Endpoint::post(P, "stk_push", "/mpesa/stk-push", "/mpesa/stkpush/v1/processrequest")
            .schema(stk_push_schema())
            .money_moving()
            .messages("STK Push", "STK Push sent successfully.", "STK Push unsuccessful"),
        Endpoint::post(P, "c2b_register", "/mpesa/c2b", "/mpesa/c2b/v1/registerurl")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("ShortCode").required(),
                FieldSpec::inbound("ResponseType").default_value(json!("Completed")),
                FieldSpec::inbound("ConfirmationURL").required(),
                FieldSpec::inbound("ValidationURL").required(),
            ]))
            .messages("C2B transaction", "C2B transaction successfully.", "C2B transaction unsuccessful"),
        Endpoint::post(P, "b2c_payment", "/mpesa/b2c", "/mpesa/b2c/v1/paymentrequest")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("OriginatorConversationID"),
                FieldSpec::inbound("InitiatorName").required(),
                FieldSpec::inbound("SecurityCredential").required(),
                FieldSpec::inbound("CommandID").required(),
                FieldSpec::inbound("Amount").required().amount(),
                FieldSpec::inbound("PartyA").required(),
                FieldSpec::inbound("PartyB").required(),
                FieldSpec::inbound("Remarks"),
                FieldSpec::inbound("QueueTimeOutURL").required(),
                FieldSpec::inbound("ResultURL").required(),
                FieldSpec::inbound("Occassion"),
            ]))
            .money_moving()
            .messages("B2C transaction", "B2C transaction successfully.", "B2C transaction unsuccessful"),
        Endpoint::post(
            P,
            "transaction_status",
            "/mpesa/transaction-status",
            "/mpesa/transactionstatus/v1/query",
        )
        .schema(EndpointSchema::new(vec![
            FieldSpec::inbound("Initiator"),
            FieldSpec::inbound("SecurityCredential"),
            FieldSpec::inbound("CommandID").default_value(json!("TransactionStatusQuery")),
            FieldSpec::inbound("TransactionID").required(),
            FieldSpec::inbound("OriginatorConversationID"),
            FieldSpec::inbound("PartyA").required(),
            FieldSpec::inbound("IdentifierType"),
            FieldSpec::inbound("ResultURL").required(),
            FieldSpec::inbound("QueueTimeOutURL").required(),
            FieldSpec::inbound("Remarks"),
            FieldSpec::inbound("Occasion"),
        ]))
        .messages(
            "Transaction status query",
            "Transaction status query sent successfully.",
            "Transaction status query unsuccessful",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::{Map, Value};

    use super::*;
    use crate::schema::BuildContext;

    #[test]
    fn test_stk_push_injects_credentials_and_defaults() {
        let ctx = BuildContext {
            short_code: Some("174379".into()),
            password: Some(SecretString::from("cGFzc3dvcmQ=")),
            timestamp: Some("20240304050607".into()),
            ..BuildContext::default()
        };
        let Value::Object(inbound) = json!({
            "Amount": 1,
            "PhoneNumber": "254708374149",
            "CallBackURL": "https://example.com/cb",
            "Password": "caller-supplied"
        }) else {
            panic!("object literal");
        };

        let payload = stk_push_schema().shape(&inbound, &ctx).unwrap();
        assert_eq!(payload["BusinessShortCode"], "174379");
        assert_eq!(payload["PartyB"], "174379");
        assert_eq!(payload["Password"], "cGFzc3dvcmQ=");
        assert_eq!(payload["Timestamp"], "20240304050607");
        assert_eq!(payload["TransactionType"], "CustomerPayBillOnline");
        assert!(!payload.contains_key("AccountReference"));
    }

    #[test]
    fn test_stk_push_reports_missing_fields() {
        let err = stk_push_schema().shape(&Map::new(), &BuildContext::default()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: Amount, PhoneNumber, CallBackURL");
    }

    #[test]
    fn test_b2c_posts_to_payment_request_path() {
        let endpoints = endpoints();
        let b2c = endpoints.iter().find(|e| e.operation == "b2c_payment").unwrap();
        assert_eq!(b2c.upstream_path, "/mpesa/b2c/v1/paymentrequest");
        assert!(b2c.money_moving);
    }
}
