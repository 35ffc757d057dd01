//! GraphQL documents for the admin API, kept in one place.
use serde_json::{json, Value};

pub struct AdminQueries;

impl AdminQueries {
    /// Single-variant price mutation. The platform exposes no bulk-mutation
    /// primitive, so bulk work is N of these.
    pub fn variant_update() -> &'static str {
        r#"
        mutation productVariantUpdate($input: ProductVariantInput!) {
            productVariantUpdate(input: $input) {
                productVariant {
                    id
                    price
                }
                userErrors {
                    field
                    message
                }
            }
        }
        "#
    }

    pub fn variant_update_variables(variant_id: &str, price: &str) -> Value {
        json!({
            "input": {
                "id": variant_id,
                "price": price,
            }
        })
    }
}
