//! Regional payments gateway endpoints, Kenya and Tanzania.
//!
//! Both countries share payload shapes; they differ in routes, default
//! currency and which operations are offered.

use super::{Endpoint, Provider};
use crate::schema::{ContextValue, EndpointSchema, FieldSpec};

fn currency() -> FieldSpec {
    FieldSpec::inbound("Currency").default_from(ContextValue::Currency)
}

fn amount() -> FieldSpec {
    FieldSpec::inbound("Amount").required().amount()
}

fn c2b_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::inbound("MerchantCode").required(),
        FieldSpec::inbound("NetworkCode").required(),
        currency(),
        amount(),
        FieldSpec::inbound("CallBackURL").required(),
        FieldSpec::inbound("PhoneNumber").required(),
        FieldSpec::inbound("TransactionDesc"),
        FieldSpec::inbound("AccountReference"),
    ]
}

fn c2b_with_fee_schema() -> EndpointSchema {
    let mut fields = c2b_fields();
    fields.push(FieldSpec::inbound("TransactionFee"));
    EndpointSchema::new(fields)
}

fn b2c_schema() -> EndpointSchema {
    EndpointSchema::new(vec![
        FieldSpec::inbound("MerchantCode").required(),
        FieldSpec::inbound("MerchantTransactionReference").default_reference(),
        amount(),
        currency(),
        FieldSpec::inbound("ReceiverNumber").required(),
        FieldSpec::inbound("Channel").required(),
        FieldSpec::inbound("Reason"),
        FieldSpec::inbound("CallBackURL").required(),
    ])
}

fn b2b_schema() -> EndpointSchema {
    EndpointSchema::new(vec![
        FieldSpec::inbound("MerchantCode").required(),
        FieldSpec::inbound("MerchantTransactionReference").default_reference(),
        currency(),
        amount(),
        FieldSpec::inbound("ReceiverMerchantCode").required(),
        FieldSpec::inbound("AccountReference"),
        FieldSpec::inbound("ReceiverAccountType"),
        FieldSpec::inbound("NetworkCode"),
        FieldSpec::inbound("CallBackURL").required(),
        FieldSpec::inbound("Reason"),
    ])
}

fn checkout_schema() -> EndpointSchema {
    EndpointSchema::new(vec![
        FieldSpec::inbound("MerchantCode").required(),
        amount(),
        FieldSpec::inbound("Reference").default_reference(),
        FieldSpec::inbound("Description"),
        currency(),
        FieldSpec::inbound("PayerEmail"),
        FieldSpec::inbound("CallbackUrl").required(),
        FieldSpec::inbound("SuccessUrl"),
        FieldSpec::inbound("FailureUrl"),
        FieldSpec::inbound("SasaPayWalletEnabled"),
        FieldSpec::inbound("MpesaEnabled"),
        FieldSpec::inbound("CardEnabled"),
        FieldSpec::inbound("AirtelEnabled"),
    ])
}

fn remittance_schema() -> EndpointSchema {
    let optional = [
        "DestinationChannelName",
        "ReceiverPhoneNumber",
        "ReceiverAccountNumber",
        "AccountReference",
        "ReceiverAccountType",
        "ReceiverAccountName",
        "ForeignCurrency",
        "SenderPhoneNumber",
        "SenderName",
        "SenderDOB",
        "SenderCountryISO",
        "SenderNationality",
        "SenderIDType",
        "SenderIDNumber",
        "SenderServiceProviderName",
        "RemittancePurpose",
        "Remarks",
    ];
    let mut fields = vec![
        FieldSpec::inbound("MerchantCode").required(),
        FieldSpec::inbound("MerchantTransactionReference").default_reference(),
        FieldSpec::inbound("DestinationChannelCode").required(),
        currency(),
        amount(),
        FieldSpec::inbound("CallbackUrl").required(),
    ];
    fields.extend(optional.into_iter().map(FieldSpec::inbound));
    EndpointSchema::new(fields)
}

fn payment_request(provider: Provider, route: &'static str, schema: EndpointSchema) -> Endpoint {
    Endpoint::post(provider, "c2b_request", route, "/payments/request-payment/")
        .schema(schema)
        .money_moving()
        .messages("Request to SasaPay", "Payment request sent successfully.", "Payment request failed.")
}

fn b2c(provider: Provider, route: &'static str) -> Endpoint {
    Endpoint::post(provider, "b2c_payment", route, "/payments/b2c/")
        .schema(b2c_schema())
        .money_moving()
        .messages("B2C request", "B2C Payment request sent successfully.", "B2C Transaction Failed")
}

fn b2b(provider: Provider, route: &'static str) -> Endpoint {
    Endpoint::post(provider, "b2b_payment", route, "/payments/b2b/")
        .schema(b2b_schema())
        .money_moving()
        .messages("B2B request", "B2B Payment request sent successfully.", "B2B Transaction Failed")
}

pub(super) fn kenya_endpoints() -> Vec<Endpoint> {
    const P: Provider = Provider::Sasapay;
    let mut mobile = payment_request(P, "/sasapay/c2b-mobile", c2b_with_fee_schema());
    mobile.operation = "c2b_mobile";

    vec![
        Endpoint::introspection(P, "/sasapay/auth"),
        payment_request(P, "/sasapay/c2b-payment", EndpointSchema::new(c2b_fields())),
        mobile,
        Endpoint::post(P, "process_payment", "/sasapay/process-payment", "/payments/process-payment/")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("CheckoutRequestID").required(),
                FieldSpec::inbound("MerchantCode").required(),
                FieldSpec::inbound("VerificationCode").required(),
            ]))
            .money_moving()
            .messages("Request to SasaPay", "Request processed", "Payment processing failed"),
        b2c(P, "/sasapay/b2c-payment"),
        b2b(P, "/sasapay/b2b-payment"),
        Endpoint::get(P, "channel_codes", "/sasapay/channel-codes", "/payments/channel-codes/")
            .messages("Channel codes request", "Channel Codes available", "Channel codes unavailable"),
        Endpoint::post(P, "checkout", "/sasapay/checkout", "/payments/card-payments/")
            .schema(checkout_schema())
            .money_moving()
            .messages(
                "Checkout Request to SasaPay",
                "Checkout processed successfully.",
                "Checkout process failed",
            ),
        Endpoint::post(P, "remittance", "/sasapay/remittance", "/remittances/remittance-payments/")
            .schema(remittance_schema())
            .money_moving()
            .messages(
                "Remittance Request to SasaPay",
                "Remittance processed successfully.",
                "Remittance process failed",
            ),
        Endpoint::callback(P, "/sasapay/c2b-callback"),
        Endpoint::ipn(P, "/sasapay/ipn"),
    ]
}

pub(super) fn tanzania_endpoints() -> Vec<Endpoint> {
    const P: Provider = Provider::SasapayTz;
    vec![
        Endpoint::introspection(P, "/sasapay-tz/auth"),
        payment_request(P, "/sasapay-tz/c2b", c2b_with_fee_schema()),
        b2c(P, "/sasapay-tz/b2c"),
        b2b(P, "/sasapay-tz/b2b"),
        Endpoint::post(P, "fund_movement", "/sasapay-tz/ifm", "/transactions/fund-movement/")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("merchantCode").required(),
                FieldSpec::inbound("amount").required().amount(),
            ]))
            .money_moving()
            .messages("Transaction", "Transaction completed successfully.", "Transaction failed."),
        Endpoint::callback(P, "/sasapay-tz/c2b/callback"),
        Endpoint::ipn(P, "/sasapay-tz/c2b/ipn"),
    ]
}
