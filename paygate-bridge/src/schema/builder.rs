//! Outbound request construction.

use std::collections::HashMap;

use secrecy::SecretString;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::EndpointSchema;
use crate::{
    crypto::FieldEncryptor,
    error::{GatewayError, Result},
    transport::HttpMethod,
};

/// Longest accepted path parameter.
const MAX_PARAM_LEN: usize = 64;

/// Provider-side values available to a schema while shaping.
#[derive(Debug, Default)]
pub struct BuildContext<'a> {
    /// Default currency code.
    pub currency: Option<String>,
    /// Merchant short code.
    pub short_code: Option<String>,
    /// STK push password for [`timestamp`](Self::timestamp).
    pub password: Option<SecretString>,
    /// `YYYYMMDDHHMMSS` timestamp.
    pub timestamp: Option<String>,
    /// Card field encryptor.
    pub encryptor: Option<&'a FieldEncryptor>,
}

/// A shaped provider call, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Upstream path with parameters substituted, relative to the base URL.
    pub path: String,
    /// Query pairs (GET endpoints only).
    pub query: Vec<(String, String)>,
    /// JSON body (POST/PUT endpoints only).
    pub body: Option<Value>,
    /// Fresh `X-Trace-Id`.
    pub trace_id: Uuid,
    /// Fresh `X-Idempotency-Key` for money-moving mutations.
    pub idempotency_key: Option<Uuid>,
}

/// Builds [`OutboundRequest`]s for one endpoint.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use paygate_bridge::{
///     schema::{BuildContext, EndpointSchema, FieldSpec, RequestBuilder},
///     transport::HttpMethod,
/// };
/// use serde_json::json;
///
/// let schema = EndpointSchema::new(vec![FieldSpec::inbound("Amount").required().amount()]);
/// let builder = RequestBuilder::new(HttpMethod::Post, "/payments/b2c/", &schema).money_moving(true);
///
/// let request = builder
///     .build(&json!({"Amount": 100, "Extra": 1}), &HashMap::new(), &BuildContext::default())
///     .unwrap();
/// assert_eq!(request.body, Some(json!({"Amount": 100})));
/// assert!(request.idempotency_key.is_some());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'s> {
    method: HttpMethod,
    path: &'static str,
    schema: &'s EndpointSchema,
    money_moving: bool,
}

impl<'s> RequestBuilder<'s> {
    /// Creates a builder for `method path` shaped by `schema`.
    #[must_use]
    pub const fn new(method: HttpMethod, path: &'static str, schema: &'s EndpointSchema) -> Self {
        Self { method, path, schema, money_moving: false }
    }

    /// Marks the endpoint as moving money, which attaches an idempotency key
    /// to POST and PUT calls.
    #[must_use]
    pub const fn money_moving(mut self, money_moving: bool) -> Self {
        self.money_moving = money_moving;
        self
    }

    /// Builds one outbound request.
    ///
    /// A null inbound body is treated as an empty object.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Validation`] if the body is not an object, a path
    ///   parameter is missing or malformed, or the schema rejects the body
    /// - errors from [`EndpointSchema::shape`]
    pub fn build(
        &self,
        inbound: &Value,
        params: &HashMap<String, String>,
        ctx: &BuildContext<'_>,
    ) -> Result<OutboundRequest> {
        let empty = Map::new();
        let fields = match inbound {
            Value::Object(fields) => fields,
            Value::Null => &empty,
            _ => return Err(GatewayError::Validation("request body must be a JSON object".into())),
        };

        let path = render_path(self.path, params)?;
        let payload = self.schema.shape(fields, ctx)?;

        let (query, body) = match self.method {
            HttpMethod::Get => (to_query(payload), None),
            HttpMethod::Post | HttpMethod::Put => (Vec::new(), Some(Value::Object(payload))),
        };
        let idempotency_key =
            (self.money_moving && self.method.is_mutation()).then(Uuid::new_v4);

        Ok(OutboundRequest {
            method: self.method,
            path,
            query,
            body,
            trace_id: Uuid::new_v4(),
            idempotency_key,
        })
    }
}

/// Substitutes `{name}` placeholders in `template` from `params`.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] if a placeholder has no value, or the
/// value is not 1-64 characters of `[A-Za-z0-9_-]`.
pub fn render_path(template: &str, params: &HashMap<String, String>) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
            break;
        };
        let name = &rest[open + 1..close];
        let value = params
            .get(name)
            .ok_or_else(|| GatewayError::Validation(format!("Missing path parameter: {name}")))?;
        if !is_valid_param(value) {
            return Err(GatewayError::Validation(format!(
                "Invalid {name}: expected 1-{MAX_PARAM_LEN} characters of [A-Za-z0-9_-]"
            )));
        }
        rendered.push_str(&rest[..open]);
        rendered.push_str(value);
        rest = &rest[close + 1..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

fn is_valid_param(value: &str) -> bool {
    (1..=MAX_PARAM_LEN).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn to_query(payload: Map<String, Value>) -> Vec<(String, String)> {
    payload
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (name, text)
        })
        .collect()
}
