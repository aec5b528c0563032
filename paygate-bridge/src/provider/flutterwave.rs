//! Card and orchestration gateway endpoints.

use serde_json::json;

use super::{Endpoint, Provider};
use crate::schema::{EndpointSchema, FieldSpec};

const P: Provider = Provider::Flutterwave;

fn customer_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::inbound("email"),
        FieldSpec::inbound("first_name").to("name.first"),
        FieldSpec::inbound("middle_name").to("name.middle"),
        FieldSpec::inbound("last_name").to("name.last"),
        FieldSpec::inbound("phone_country_code").to("phone.country_code"),
        FieldSpec::inbound("phone_number").to("phone.number"),
        FieldSpec::inbound("address_line1").to("address.line1"),
        FieldSpec::inbound("address_line2").to("address.line2"),
        FieldSpec::inbound("city").to("address.city"),
        FieldSpec::inbound("state").to("address.state"),
        FieldSpec::inbound("postal_code").to("address.postal_code"),
        FieldSpec::inbound("country").to("address.country"),
        FieldSpec::inbound("meta"),
    ]
}

fn create_customer_schema() -> EndpointSchema {
    let mut fields = customer_fields();
    fields[0] = FieldSpec::inbound("email").required();
    EndpointSchema::new(fields)
}

fn direct_charge_schema() -> EndpointSchema {
    EndpointSchema::new(vec![
        FieldSpec::inbound("amount").required().amount(),
        FieldSpec::inbound("currency").required(),
        FieldSpec::inbound("reference").default_reference(),
        FieldSpec::inbound("redirect_url"),
        FieldSpec::inbound("meta"),
        FieldSpec::inbound("email").required().to("customer.email"),
        FieldSpec::inbound("first_name").to("customer.name.first_name"),
        FieldSpec::inbound("last_name").to("customer.name.last_name"),
        FieldSpec::inbound("phone_country_code").to("customer.phone.country_code"),
        FieldSpec::inbound("phone_number").to("customer.phone.number"),
        FieldSpec::inbound("address_line1").to("customer.address.line1"),
        FieldSpec::inbound("city").to("customer.address.city"),
        FieldSpec::inbound("state").to("customer.address.state"),
        FieldSpec::inbound("postal_code").to("customer.address.postal_code"),
        FieldSpec::inbound("country").to("customer.address.country"),
        FieldSpec::constant("payment_method.type", json!("card")),
        FieldSpec::inbound("card_number")
            .required()
            .to("payment_method.card.encrypted_card_number")
            .sensitive(),
        FieldSpec::inbound("expiry_month")
            .required()
            .to("payment_method.card.encrypted_expiry_month")
            .sensitive(),
        FieldSpec::inbound("expiry_year")
            .required()
            .to("payment_method.card.encrypted_expiry_year")
            .sensitive(),
        FieldSpec::inbound("cvv").required().to("payment_method.card.encrypted_cvv").sensitive(),
        FieldSpec::inbound("card_holder_name").to("payment_method.card.card_holder_name"),
        FieldSpec::inbound("billing_address").to("payment_method.card.billing_address"),
        FieldSpec::inbound("cof").to("payment_method.card.cof"),
    ])
    .with_card_nonce("payment_method.card.nonce")
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::introspection(P, "/flutterwave/auth"),
        Endpoint::get(P, "list_customers", "/flutterwave/customers", "/customers")
            .schema(EndpointSchema::new(vec![FieldSpec::inbound("page"), FieldSpec::inbound("size")]))
            .messages("List customers", "Customers fetched successfully", "Failed to fetch customers"),
        Endpoint::post(P, "create_customer", "/flutterwave/customers", "/customers")
            .schema(create_customer_schema())
            .messages("Create customer", "Customer created successfully", "Customer creation failed"),
        Endpoint::get(P, "get_customer", "/flutterwave/customers/{id}", "/customers/{id}")
            .messages("Get customer", "Customer fetched successfully", "Failed to fetch customer"),
        Endpoint::put(P, "update_customer", "/flutterwave/customers/{id}", "/customers/{id}")
            .schema(EndpointSchema::new(customer_fields()))
            .messages("Update customer", "Customer updated successfully", "Customer update failed"),
        Endpoint::post(P, "search_customers", "/flutterwave/customers/search", "/customers/search")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("email").required(),
                FieldSpec::inbound("page"),
                FieldSpec::inbound("size"),
            ]))
            .messages("Search customers", "Customers fetched successfully", "Customer search failed"),
        Endpoint::post(P, "create_charge", "/flutterwave/charges", "/charges")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("amount").required().amount(),
                FieldSpec::inbound("currency").required(),
                FieldSpec::inbound("customer_id").required(),
                FieldSpec::inbound("payment_method_id").required(),
                FieldSpec::inbound("reference").default_reference(),
                FieldSpec::inbound("redirect_url"),
                FieldSpec::inbound("authorization"),
                FieldSpec::inbound("recurring"),
                FieldSpec::inbound("meta"),
            ]))
            .money_moving()
            .messages("Create charge", "Charge created successfully", "Charge creation failed"),
        Endpoint::get(P, "get_charge", "/flutterwave/charges/{id}", "/charges/{id}")
            .messages("Get charge", "Charge fetched successfully", "Failed to fetch charge"),
        Endpoint::put(P, "update_charge", "/flutterwave/charges/{id}", "/charges/{id}")
            .schema(EndpointSchema::new(vec![
                FieldSpec::inbound("meta"),
                FieldSpec::inbound("authorization"),
            ]))
            .money_moving()
            .messages("Update charge", "Charge updated successfully", "Charge update failed"),
        Endpoint::post(P, "direct_charge", "/flutterwave/direct-charges", "/orchestration/direct-charges")
            .schema(direct_charge_schema())
            .money_moving()
            .messages("Direct charge", "Charge initiated successfully", "Direct charge failed"),
    ]
}
