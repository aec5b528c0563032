//! Field specifications.
//!
//! A [`FieldSpec`] says where one outbound payload field comes from, where it
//! lands in the provider payload and how it is checked.

use serde_json::Value;

/// Where a field's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// Copied from the inbound body under this name.
    Inbound(&'static str),
    /// Fixed value.
    Constant(Value),
    /// Supplied by the provider configuration or the current request.
    Context(ContextValue),
}

/// Values injected from provider configuration rather than the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextValue {
    /// Provider default currency (`KES`, `TZS`).
    Currency,
    /// Merchant short code.
    ShortCode,
    /// Timestamp-bound STK push password.
    Password,
    /// `YYYYMMDDHHMMSS` timestamp the password was derived from.
    Timestamp,
}

/// Fallback used when an inbound field is absent or null.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// Fixed value.
    Value(Value),
    /// Value from the build context.
    Context(ContextValue),
    /// Freshly generated `txn-<12 hex>` reference.
    Reference,
}

/// Validation applied to a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Must parse as a decimal number of at least 0.01.
    Amount,
}

/// One outbound payload field.
///
/// # Examples
///
/// ```
/// use paygate_bridge::schema::{ContextValue, FieldSpec};
///
/// let amount = FieldSpec::inbound("Amount").required().amount();
/// let currency = FieldSpec::inbound("Currency").default_from(ContextValue::Currency);
/// let pan = FieldSpec::inbound("card_number")
///     .to("payment_method.card.encrypted_card_number")
///     .sensitive();
///
/// assert!(amount.is_required());
/// assert_eq!(pan.target(), "payment_method.card.encrypted_card_number");
/// # let _ = currency;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    source: FieldSource,
    target: &'static str,
    required: bool,
    default: Option<FieldDefault>,
    check: Option<Check>,
    sensitive: bool,
}

impl FieldSpec {
    /// Field copied from the inbound body, landing under the same name.
    #[must_use]
    pub const fn inbound(name: &'static str) -> Self {
        Self::with_source(FieldSource::Inbound(name), name)
    }

    /// Field with a fixed value.
    #[must_use]
    pub const fn constant(target: &'static str, value: Value) -> Self {
        Self::with_source(FieldSource::Constant(value), target)
    }

    /// Field taken from the build context.
    #[must_use]
    pub const fn context(target: &'static str, value: ContextValue) -> Self {
        Self::with_source(FieldSource::Context(value), target)
    }

    const fn with_source(source: FieldSource, target: &'static str) -> Self {
        Self { source, target, required: false, default: None, check: None, sensitive: false }
    }

    /// Sets the dotted target path (`customer.name.first_name`).
    #[must_use]
    pub const fn to(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }

    /// Marks the field as required: it must be present, non-null and non-empty.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Applies the amount check.
    #[must_use]
    pub const fn amount(mut self) -> Self {
        self.check = Some(Check::Amount);
        self
    }

    /// Routes the field through card encryption.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Uses `value` when the inbound field is absent.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Value(value));
        self
    }

    /// Uses a context value when the inbound field is absent.
    #[must_use]
    pub fn default_from(mut self, value: ContextValue) -> Self {
        self.default = Some(FieldDefault::Context(value));
        self
    }

    /// Generates a `txn-<12 hex>` reference when the inbound field is absent.
    #[must_use]
    pub fn default_reference(mut self) -> Self {
        self.default = Some(FieldDefault::Reference);
        self
    }

    /// Returns the value source.
    #[must_use]
    pub const fn source(&self) -> &FieldSource {
        &self.source
    }

    /// Returns the dotted target path.
    #[must_use]
    pub const fn target(&self) -> &'static str {
        self.target
    }

    /// Inbound name for required-field reporting, if the field is caller supplied.
    #[must_use]
    pub const fn inbound_name(&self) -> Option<&'static str> {
        match self.source {
            FieldSource::Inbound(name) => Some(name),
            FieldSource::Constant(_) | FieldSource::Context(_) => None,
        }
    }

    /// Whether the caller must supply the field.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the fallback, if any.
    #[must_use]
    pub const fn default(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    /// Returns the check, if any.
    #[must_use]
    pub const fn check(&self) -> Option<Check> {
        self.check
    }

    /// Whether the field is encrypted before leaving the gateway.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        self.sensitive
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_inbound_targets_same_name() {
        let spec = FieldSpec::inbound("PhoneNumber");
        assert_eq!(spec.target(), "PhoneNumber");
        assert_eq!(spec.inbound_name(), Some("PhoneNumber"));
        assert!(!spec.is_required());
        assert!(!spec.is_sensitive());
    }

    #[test]
    fn test_builder_chain() {
        let spec = FieldSpec::inbound("first_name").to("customer.name.first_name").required();
        assert_eq!(spec.target(), "customer.name.first_name");
        assert!(spec.is_required());
    }

    #[test]
    fn test_constant_has_no_inbound_name() {
        let spec = FieldSpec::constant("payment_method.type", json!("card"));
        assert_eq!(spec.inbound_name(), None);
        assert_eq!(spec.source(), &FieldSource::Constant(json!("card")));
    }

    #[test]
    fn test_defaults() {
        let spec = FieldSpec::inbound("CommandID").default_value(json!("TransactionStatusQuery"));
        assert_eq!(spec.default(), Some(&FieldDefault::Value(json!("TransactionStatusQuery"))));
        let spec = FieldSpec::inbound("reference").default_reference();
        assert_eq!(spec.default(), Some(&FieldDefault::Reference));
    }
}
