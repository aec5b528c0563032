//! Declarative endpoint schemas.
//!
//! Every provider endpoint describes its outbound payload as a list of
//! [`FieldSpec`]s. [`EndpointSchema::shape`] applies that list to an inbound
//! body:
//!
//! 1. required fields must be present, non-null and non-empty;
//! 2. values are resolved from the body, constants or the [`BuildContext`],
//!    with defaults filling absent fields and nulls dropped;
//! 3. amount fields must parse as a number of at least 0.01;
//! 4. sensitive fields are encrypted as one record and spliced back in with
//!    the record nonce.
//!
//! Inbound fields the schema does not name never reach the provider.

pub mod builder;
pub mod field;

use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use uuid::Uuid;

pub use builder::{BuildContext, OutboundRequest, RequestBuilder, render_path};
pub use field::{Check, ContextValue, FieldDefault, FieldSource, FieldSpec};

use crate::error::{GatewayError, Result};

/// Smallest accepted amount, 0.01.
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Where the card record nonce lands when the schema names none.
const DEFAULT_NONCE_TARGET: &str = "nonce";

/// Outbound payload description for one endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointSchema {
    fields: Vec<FieldSpec>,
    card_nonce_target: Option<&'static str>,
}

impl EndpointSchema {
    /// Creates a schema from its fields.
    #[must_use]
    pub const fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields, card_nonce_target: None }
    }

    /// Schema with no fields; the shaped payload is always empty.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Sets the dotted path receiving the card record nonce.
    #[must_use]
    pub const fn with_card_nonce(mut self, target: &'static str) -> Self {
        self.card_nonce_target = Some(target);
        self
    }

    /// Returns the field list.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Inbound names of the required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|spec| spec.is_required()).filter_map(FieldSpec::inbound_name)
    }

    /// Shapes an inbound body into the provider payload.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Validation`] naming every missing required field,
    ///   or the first amount that is non-numeric or below [`MIN_AMOUNT`]
    /// - [`GatewayError::Config`] if a context value or the card key is not
    ///   configured
    /// - [`GatewayError::InvalidInput`] / [`GatewayError::Crypto`] from card
    ///   encryption
    pub fn shape(&self, inbound: &Map<String, Value>, ctx: &BuildContext<'_>) -> Result<Map<String, Value>> {
        let missing: Vec<&str> =
            self.required_fields().filter(|name| is_missing(inbound.get(*name))).collect();
        if !missing.is_empty() {
            return Err(GatewayError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let mut payload = Map::new();
        let mut sensitive = Map::new();

        for spec in &self.fields {
            let Some(value) = resolve(spec, inbound, ctx)? else {
                continue;
            };

            if spec.check() == Some(Check::Amount) {
                check_amount(spec.inbound_name().unwrap_or(spec.target()), &value)?;
            }

            if spec.is_sensitive() {
                sensitive.insert(spec.target().to_owned(), value);
            } else {
                set_path(&mut payload, spec.target(), value);
            }
        }

        if !sensitive.is_empty() {
            let encryptor = ctx.encryptor.ok_or_else(|| {
                GatewayError::Config("card encryption key is not configured".into())
            })?;
            let mut sealed = encryptor.encrypt_record(&Value::Object(sensitive))?;
            if let Some(nonce) = sealed.remove("nonce") {
                set_path(
                    &mut payload,
                    self.card_nonce_target.unwrap_or(DEFAULT_NONCE_TARGET),
                    nonce,
                );
            }
            for (target, ciphertext) in sealed {
                set_path(&mut payload, &target, ciphertext);
            }
        }

        Ok(payload)
    }
}

/// Absent, null, or a blank string.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

/// Resolves one field; `None` means the field is left out of the payload.
fn resolve(spec: &FieldSpec, inbound: &Map<String, Value>, ctx: &BuildContext<'_>) -> Result<Option<Value>> {
    let value = match spec.source() {
        FieldSource::Inbound(name) => inbound.get(*name).filter(|value| !value.is_null()).cloned(),
        FieldSource::Constant(value) => Some(value.clone()),
        FieldSource::Context(context) => Some(context_value(*context, ctx)?),
    };

    match (value, spec.default()) {
        (Some(value), _) => Ok(Some(value)),
        (None, Some(FieldDefault::Value(value))) => Ok(Some(value.clone())),
        (None, Some(FieldDefault::Context(context))) => Ok(Some(context_value(*context, ctx)?)),
        (None, Some(FieldDefault::Reference)) => Ok(Some(Value::String(generate_reference()))),
        (None, None) => Ok(None),
    }
}

fn context_value(value: ContextValue, ctx: &BuildContext<'_>) -> Result<Value> {
    let resolved = match value {
        ContextValue::Currency => ctx.currency.clone(),
        ContextValue::ShortCode => ctx.short_code.clone(),
        ContextValue::Password => ctx.password.as_ref().map(|secret| secret.expose_secret().to_owned()),
        ContextValue::Timestamp => ctx.timestamp.clone(),
    };
    resolved
        .map(Value::String)
        .ok_or_else(|| GatewayError::Config(format!("{value:?} is not configured for this provider")))
}

/// `txn-` followed by 12 lowercase hex digits.
#[must_use]
pub fn generate_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("txn-{}", &id[..12])
}

fn check_amount(name: &str, value: &Value) -> Result<()> {
    let amount = match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text.trim()),
        _ => None,
    }
    .ok_or_else(|| GatewayError::Validation(format!("{name} must be a number")))?;

    if amount < MIN_AMOUNT {
        return Err(GatewayError::Validation(format!("{name} must be at least {MIN_AMOUNT}")));
    }
    Ok(())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

/// Inserts `value` at a dotted path, creating intermediate objects.
fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    let (parents, leaf) = path.rsplit_once('.').map_or((None, path), |(parents, leaf)| (Some(parents), leaf));

    let mut current = map;
    for segment in parents.into_iter().flat_map(|parents| parents.split('.')) {
        let entry = current.entry(segment).or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Some(next) = entry.as_object_mut() else {
            return;
        };
        current = next;
    }
    current.insert(leaf.to_owned(), value);
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::crypto::FieldEncryptor;

    const KEY_256: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    fn charge_schema() -> EndpointSchema {
        EndpointSchema::new(vec![
            FieldSpec::inbound("amount").required().amount(),
            FieldSpec::inbound("currency").required(),
            FieldSpec::inbound("customer_id").required(),
            FieldSpec::inbound("reference").default_reference(),
        ])
    }

    #[test]
    fn test_null_optional_fields_are_dropped() {
        let schema = EndpointSchema::new(vec![
            FieldSpec::inbound("Amount").required().amount(),
            FieldSpec::inbound("PartyB"),
        ]);
        let payload =
            schema.shape(&body(json!({"Amount": 100, "PartyB": null})), &BuildContext::default()).unwrap();

        assert_eq!(payload.get("Amount"), Some(&json!(100)));
        assert!(!payload.contains_key("PartyB"));
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let schema = EndpointSchema::new(vec![FieldSpec::inbound("Amount")]);
        let payload =
            schema.shape(&body(json!({"Amount": 5, "Injected": "x"})), &BuildContext::default()).unwrap();
        assert_eq!(Value::Object(payload), json!({"Amount": 5}));
    }

    #[test]
    fn test_missing_required_fields_are_listed() {
        let err = charge_schema()
            .shape(&body(json!({"currency": "KES"})), &BuildContext::default())
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(err.to_string(), "Missing required fields: amount, customer_id");
    }

    #[test]
    fn test_blank_string_counts_as_missing() {
        let err = charge_schema()
            .shape(
                &body(json!({"amount": 10, "currency": "  ", "customer_id": "c_1"})),
                &BuildContext::default(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: currency");
    }

    #[test]
    fn test_negative_amount_is_below_minimum() {
        let err = charge_schema()
            .shape(
                &body(json!({"amount": "-5", "currency": "KES", "customer_id": "c_1"})),
                &BuildContext::default(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "amount must be at least 0.01");
    }

    #[test]
    fn test_non_numeric_amount_is_rejected() {
        let err = charge_schema()
            .shape(
                &body(json!({"amount": "abc", "currency": "KES", "customer_id": "c_1"})),
                &BuildContext::default(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "amount must be a number");
    }

    #[test]
    fn test_amount_keeps_original_representation() {
        let payload = charge_schema()
            .shape(
                &body(json!({"amount": "0.01", "currency": "KES", "customer_id": "c_1"})),
                &BuildContext::default(),
            )
            .unwrap();
        assert_eq!(payload["amount"], json!("0.01"));
    }

    #[test]
    fn test_reference_is_generated_when_absent() {
        let payload = charge_schema()
            .shape(
                &body(json!({"amount": 10, "currency": "KES", "customer_id": "c_1"})),
                &BuildContext::default(),
            )
            .unwrap();
        let reference = payload["reference"].as_str().unwrap();
        assert!(reference.starts_with("txn-"));
        assert_eq!(reference.len(), 16);
        assert!(reference[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_caller_reference_wins_over_default() {
        let payload = charge_schema()
            .shape(
                &body(json!({"amount": 10, "currency": "KES", "customer_id": "c_1", "reference": "mine"})),
                &BuildContext::default(),
            )
            .unwrap();
        assert_eq!(payload["reference"], "mine");
    }

    #[test]
    fn test_context_defaults_and_nested_targets() {
        let schema = EndpointSchema::new(vec![
            FieldSpec::inbound("Currency").default_from(ContextValue::Currency),
            FieldSpec::inbound("first_name").to("name.first"),
            FieldSpec::inbound("last_name").to("name.last"),
            FieldSpec::constant("payment_method.type", json!("card")),
        ]);
        let ctx = BuildContext { currency: Some("TZS".into()), ..BuildContext::default() };
        let payload = schema.shape(&body(json!({"first_name": "Ada", "last_name": "L"})), &ctx).unwrap();

        assert_eq!(
            Value::Object(payload),
            json!({
                "Currency": "TZS",
                "name": {"first": "Ada", "last": "L"},
                "payment_method": {"type": "card"}
            })
        );
    }

    #[test]
    fn test_missing_context_value_is_config_error() {
        let schema = EndpointSchema::new(vec![FieldSpec::context("BusinessShortCode", ContextValue::ShortCode)]);
        let err = schema.shape(&Map::new(), &BuildContext::default()).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_password_context_is_exposed_into_payload() {
        let schema = EndpointSchema::new(vec![
            FieldSpec::context("Password", ContextValue::Password),
            FieldSpec::context("Timestamp", ContextValue::Timestamp),
        ]);
        let ctx = BuildContext {
            password: Some(SecretString::from("cGFzcw==")),
            timestamp: Some("20240101000000".into()),
            ..BuildContext::default()
        };
        let payload = schema.shape(&Map::new(), &ctx).unwrap();
        assert_eq!(payload["Password"], "cGFzcw==");
        assert_eq!(payload["Timestamp"], "20240101000000");
    }

    #[test]
    fn test_card_fields_are_encrypted_and_spliced() {
        let schema = EndpointSchema::new(vec![
            FieldSpec::inbound("amount").required().amount(),
            FieldSpec::inbound("card_number").to("payment_method.card.encrypted_card_number").sensitive(),
            FieldSpec::inbound("cvv").to("payment_method.card.encrypted_cvv").sensitive(),
            FieldSpec::constant("payment_method.type", json!("card")),
        ])
        .with_card_nonce("payment_method.card.nonce");
        let encryptor = FieldEncryptor::from_base64(&SecretString::from(KEY_256)).unwrap();
        let ctx = BuildContext { encryptor: Some(&encryptor), ..BuildContext::default() };

        let payload = schema
            .shape(&body(json!({"amount": 10, "card_number": "4111111111111111", "cvv": 123})), &ctx)
            .unwrap();

        let card = &payload["payment_method"]["card"];
        let nonce = card["nonce"].as_str().unwrap();
        assert_eq!(nonce.len(), 12);
        let pan = card["encrypted_card_number"].as_str().unwrap();
        assert_ne!(pan, "4111111111111111");
        assert_eq!(encryptor.decrypt(pan, nonce).unwrap(), "4111111111111111");
        assert_eq!(encryptor.decrypt(card["encrypted_cvv"].as_str().unwrap(), nonce).unwrap(), "123");
        assert_eq!(payload["payment_method"]["type"], "card");
        assert!(!payload.contains_key("card_number"));
    }

    #[test]
    fn test_card_fields_without_key_is_config_error() {
        let schema = EndpointSchema::new(vec![FieldSpec::inbound("cvv").sensitive()]);
        let err = schema.shape(&body(json!({"cvv": "123"})), &BuildContext::default()).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_absent_card_fields_skip_encryption() {
        let schema = EndpointSchema::new(vec![FieldSpec::inbound("cvv").sensitive()]);
        let payload = schema.shape(&Map::new(), &BuildContext::default()).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_set_path_replaces_scalar_parent() {
        let mut map = body(json!({"a": 1}));
        set_path(&mut map, "a.b", json!(2));
        assert_eq!(Value::Object(map), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_min_amount_constant() {
        assert_eq!(MIN_AMOUNT.to_string(), "0.01");
    }
}
