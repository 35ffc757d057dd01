//! Response shapes for the admin GraphQL API.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<VariantUpdateData>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantUpdateData {
    pub product_variant_update: Option<VariantUpdatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantUpdatePayload {
    pub product_variant: Option<ProductVariant>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub price: Option<String>,
}

/// Application-level validation error returned inside a 200 response.
#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl UserError {
    /// Dotted field path, e.g. "input.price".
    pub fn field_path(&self) -> Option<String> {
        self.field.as_ref().map(|parts| parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_errors_payload() {
        let body = r#"{
            "data": {
                "productVariantUpdate": {
                    "productVariant": null,
                    "userErrors": [
                        {"field": ["input", "price"], "message": "Price must be positive"}
                    ]
                }
            }
        }"#;

        let response: GraphQlResponse = serde_json::from_str(body).unwrap();
        let payload = response.data.unwrap().product_variant_update.unwrap();
        assert!(payload.product_variant.is_none());
        assert_eq!(payload.user_errors.len(), 1);
        assert_eq!(
            payload.user_errors[0].field_path().unwrap(),
            "input.price"
        );
    }

    #[test]
    fn parses_successful_payload() {
        let body = r#"{
            "data": {
                "productVariantUpdate": {
                    "productVariant": {"id": "gid://shopify/ProductVariant/1", "price": "19.99"},
                    "userErrors": []
                }
            }
        }"#;

        let response: GraphQlResponse = serde_json::from_str(body).unwrap();
        let payload = response.data.unwrap().product_variant_update.unwrap();
        assert_eq!(payload.product_variant.unwrap().price.unwrap(), "19.99");
        assert!(payload.user_errors.is_empty());
    }
}
