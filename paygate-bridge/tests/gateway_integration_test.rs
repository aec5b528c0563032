//! End-to-end gateway tests against mock provider APIs.
//!
//! Each test stands up a wiremock server playing both the token endpoint and
//! the provider API, then drives [`Gateway::handle`] exactly as the server does.

use std::{collections::HashMap, sync::Arc, time::Duration};

use paygate_bridge::{
    Gateway,
    config::GatewayConfig,
    crypto::FieldEncryptor,
    provider::{self, Provider},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, header_exists, method, path, query_param},
};

/// base64 of the 32 ASCII bytes `0123456789abcdef0123456789abcdef`.
const CARD_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

fn secrets(name: &str) -> Option<String> {
    let value = match name {
        "MPESA_KEY" => "consumer",
        "MPESA_SECRET" => "secret",
        "MPESA_PASSKEY" => "passkey",
        "FLW_ID" => "flw-client",
        "FLW_SECRET" => "flw-secret",
        "FLW_KEY" => CARD_KEY,
        "SASAPAY_ID" | "SASAPAY_TZ_ID" => "sasa-client",
        "SASAPAY_SECRET" | "SASAPAY_TZ_SECRET" => "sasa-secret",
        _ => return None,
    };
    Some(value.to_owned())
}

fn gateway(server: &MockServer) -> Gateway {
    let document = format!(
        r#"
        [mpesa]
        base_url = "{uri}"
        client_id_env = "MPESA_KEY"
        client_secret_env = "MPESA_SECRET"
        short_code = "174379"
        passkey_env = "MPESA_PASSKEY"

        [flutterwave]
        base_url = "{uri}"
        token_url = "{uri}/token"
        client_id_env = "FLW_ID"
        client_secret_env = "FLW_SECRET"
        encryption_key_env = "FLW_KEY"

        [sasapay]
        base_url = "{uri}"
        client_id_env = "SASAPAY_ID"
        client_secret_env = "SASAPAY_SECRET"

        [sasapay_tz]
        base_url = "{uri}"
        client_id_env = "SASAPAY_TZ_ID"
        client_secret_env = "SASAPAY_TZ_SECRET"
        "#,
        uri = server.uri()
    );
    let config = GatewayConfig::from_toml_str(&document).expect("valid config");
    Gateway::from_config_with(&config, secrets).expect("gateway builds")
}

async fn mount_basic_token(server: &MockServer, route: &str, expires_in: u64, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("grant_type", "client_credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-basic", "expires_in": expires_in})),
        )
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_flutterwave_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-flw", "expires_in": 600})),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn no_params() -> HashMap<String, String> {
    HashMap::new()
}

fn qr_body() -> Value {
    json!({"MerchantName": "Shop", "RefNo": "INV-1", "Amount": 10, "TrxCode": "BG", "CPI": "174379"})
}

#[tokio::test]
async fn test_stk_push_end_to_end() {
    let server = MockServer::start().await;
    mount_basic_token(&server, "/oauth/v1/generate", 3599, 1).await;
    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .and(header("authorization", "Bearer tok-basic"))
        .and(header_exists("x-trace-id"))
        .and(header_exists("x-idempotency-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": "0",
            "ResponseDescription": "Success. Request accepted for processing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Mpesa, "stk_push").unwrap();
    let response = gateway
        .handle(
            endpoint,
            json!({"Amount": 1, "PhoneNumber": "254708374149", "CallBackURL": "https://example.com/cb", "PartyA": null}),
            &no_params(),
        )
        .await;

    assert!(response.status);
    assert_eq!(response.http_status, 200);
    assert_eq!(response.message, "Success. Request accepted for processing");
    assert_eq!(response.data["ResponseCode"], "0");

    let requests = server.received_requests().await.unwrap();
    let push = requests.iter().find(|r| r.url.path() == "/mpesa/stkpush/v1/processrequest").unwrap();
    let body: Value = push.body_json().unwrap();
    assert_eq!(body["BusinessShortCode"], "174379");
    assert_eq!(body["PartyB"], "174379");
    assert_eq!(body["TransactionType"], "CustomerPayBillOnline");
    assert_eq!(body["Timestamp"].as_str().unwrap().len(), 14);
    assert!(body["Password"].as_str().is_some_and(|p| !p.is_empty()));
    assert!(body.get("PartyA").is_none());
}

#[tokio::test]
async fn test_token_is_reused_while_fresh() {
    let server = MockServer::start().await;
    mount_basic_token(&server, "/oauth/v1/generate", 3599, 1).await;
    Mock::given(method("POST"))
        .and(path("/mpesa/qrcode/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ResponseCode": "00"})))
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Mpesa, "qr_code").unwrap();
    for _ in 0..2 {
        let response = gateway.handle(endpoint, qr_body(), &no_params()).await;
        assert!(response.status);
        assert_eq!(response.message, "QR Code generated successfully.");
    }
}

#[tokio::test]
async fn test_token_inside_refresh_margin_is_reissued() {
    let server = MockServer::start().await;
    // 30 s lifetime is always inside the 60 s margin.
    mount_basic_token(&server, "/oauth/v1/generate", 30, 2).await;
    Mock::given(method("POST"))
        .and(path("/mpesa/qrcode/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ResponseCode": "00"})))
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Mpesa, "qr_code").unwrap();
    gateway.handle(endpoint, qr_body(), &no_params()).await;
    gateway.handle(endpoint, qr_body(), &no_params()).await;
}

#[tokio::test]
async fn test_concurrent_callers_share_one_issuance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/token/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok", "expires_in": 3600}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/payments/channel-codes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true, "data": []})))
        .expect(8)
        .mount(&server)
        .await;

    let gateway = Arc::new(gateway(&server));
    let endpoint = provider::find(Provider::Sasapay, "channel_codes").unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let gateway = Arc::clone(&gateway);
        tasks.spawn(async move { gateway.handle(endpoint, Value::Null, &HashMap::new()).await });
    }
    while let Some(result) = tasks.join_next().await {
        let response = result.unwrap();
        assert!(response.status);
        assert_eq!(response.message, "Channel Codes available");
    }
}

#[tokio::test]
async fn test_in_body_failure_despite_http_200() {
    let server = MockServer::start().await;
    mount_basic_token(&server, "/auth/token/", 3600, 1).await;
    Mock::given(method("POST"))
        .and(path("/payments/b2c/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": false, "ResultDesc": "Insufficient funds"})),
        )
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::SasapayTz, "b2c_payment").unwrap();
    let response = gateway
        .handle(
            endpoint,
            json!({
                "MerchantCode": "600980",
                "Amount": 100,
                "ReceiverNumber": "255700000000",
                "Channel": "0",
                "CallBackURL": "https://example.com/cb"
            }),
            &no_params(),
        )
        .await;

    assert!(!response.status);
    assert_eq!(response.http_status, 200);
    assert_eq!(response.message, "Insufficient funds");
    assert_eq!(response.data["status"], false);

    let requests = server.received_requests().await.unwrap();
    let b2c = requests.iter().find(|r| r.url.path() == "/payments/b2c/").unwrap();
    let body: Value = b2c.body_json().unwrap();
    assert_eq!(body["Currency"], "TZS");
}

#[tokio::test]
async fn test_direct_charge_sends_only_ciphertext() {
    let server = MockServer::start().await;
    mount_flutterwave_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/orchestration/direct-charges"))
        .and(header("authorization", "Bearer tok-flw"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"status": "success", "message": "Charge created", "data": {"id": "chg_1"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Flutterwave, "direct_charge").unwrap();
    let response = gateway
        .handle(
            endpoint,
            json!({
                "amount": "150.00",
                "currency": "KES",
                "email": "jane@example.com",
                "card_number": "5531886652142950",
                "expiry_month": "09",
                "expiry_year": "32",
                "cvv": "564"
            }),
            &no_params(),
        )
        .await;

    assert!(response.status);
    assert_eq!(response.http_status, 201);
    assert_eq!(response.message, "Charge created");

    let requests = server.received_requests().await.unwrap();
    let charge = requests.iter().find(|r| r.url.path() == "/orchestration/direct-charges").unwrap();
    let raw = String::from_utf8_lossy(&charge.body);
    assert!(!raw.contains("5531886652142950"));

    let body: Value = charge.body_json().unwrap();
    assert_eq!(body["customer"]["email"], "jane@example.com");
    assert_eq!(body["payment_method"]["type"], "card");
    assert!(body["reference"].as_str().unwrap().starts_with("txn-"));

    let card = &body["payment_method"]["card"];
    let nonce = card["nonce"].as_str().unwrap();
    let encryptor = FieldEncryptor::from_base64(&SecretString::from(CARD_KEY)).unwrap();
    let number = encryptor.decrypt(card["encrypted_card_number"].as_str().unwrap(), nonce).unwrap();
    assert_eq!(number, "5531886652142950");
    let cvv = encryptor.decrypt(card["encrypted_cvv"].as_str().unwrap(), nonce).unwrap();
    assert_eq!(cvv, "564");
}

#[tokio::test]
async fn test_token_rejection_stops_before_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/v1/generate"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"errorMessage": "Invalid credentials"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mpesa/qrcode/v1/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Mpesa, "qr_code").unwrap();
    let response = gateway.handle(endpoint, qr_body(), &no_params()).await;

    assert!(!response.status);
    assert_eq!(response.http_status, 401);
    assert_eq!(response.message, "Invalid credentials");
    assert_eq!(response.data, json!({"errorMessage": "Invalid credentials"}));
}

#[tokio::test]
async fn test_introspection_uses_cache() {
    let server = MockServer::start().await;
    mount_basic_token(&server, "/auth/token/", 3600, 1).await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Sasapay, "auth").unwrap();

    let first = gateway.handle(endpoint, Value::Null, &no_params()).await;
    let second = gateway.handle(endpoint, Value::Null, &no_params()).await;

    assert!(first.status);
    assert_eq!(first.message, "Token retrieved successfully");
    assert_eq!(first.data["access_token"], "tok-basic");
    assert_eq!(first.data["token_type"], "Bearer");
    assert!(first.data["expires_in"].as_i64().unwrap() > 3500);
    assert_eq!(first.data["expires_at"], second.data["expires_at"]);
}

#[tokio::test]
async fn test_path_parameter_is_validated_before_any_call() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Flutterwave, "get_charge").unwrap();

    let params = HashMap::from([("id".to_owned(), "../admin".to_owned())]);
    let response = gateway.handle(endpoint, Value::Null, &params).await;

    assert_eq!(response.http_status, 400);
    assert!(response.message.starts_with("Invalid id"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_json_success_body_is_transport_failure() {
    let server = MockServer::start().await;
    mount_basic_token(&server, "/oauth/v1/generate", 3599, 1).await;
    Mock::given(method("POST"))
        .and(path("/mpesa/qrcode/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Mpesa, "qr_code").unwrap();
    let response = gateway.handle(endpoint, qr_body(), &no_params()).await;

    assert!(!response.status);
    assert_eq!(response.http_status, 500);
    assert_eq!(response.message, "QR Code generation failed: provider returned a non-JSON body");
    assert_eq!(response.data, Value::Null);
}

#[tokio::test]
async fn test_non_money_moving_call_has_no_idempotency_key() {
    let server = MockServer::start().await;
    mount_basic_token(&server, "/oauth/v1/generate", 3599, 1).await;
    Mock::given(method("POST"))
        .and(path("/mpesa/c2b/v1/registerurl"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ResponseDescription": "success"})),
        )
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let endpoint = provider::find(Provider::Mpesa, "c2b_register").unwrap();
    let response = gateway
        .handle(
            endpoint,
            json!({
                "ShortCode": "600980",
                "ConfirmationURL": "https://example.com/confirm",
                "ValidationURL": "https://example.com/validate"
            }),
            &no_params(),
        )
        .await;
    assert!(response.status);

    let requests = server.received_requests().await.unwrap();
    let register = requests.iter().find(|r| r.url.path() == "/mpesa/c2b/v1/registerurl").unwrap();
    assert!(register.headers.get("x-trace-id").is_some());
    assert!(register.headers.get("x-idempotency-key").is_none());
    let body: Value = register.body_json().unwrap();
    assert_eq!(body["ResponseType"], "Completed");
}
