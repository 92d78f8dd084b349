use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::not_blank;

/// One purchasable size of a catalog product. `price` is in rupees; `inr` is its display form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSize {
    pub id: String,
    pub label: String,
    pub price: i64,
    pub inr: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub sizes: Json<Vec<ProductSize>>,
    pub default_size_id: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storefront shape: `id` is the product slug, not the row id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub sizes: Vec<ProductSize>,
    pub default_size_id: String,
}

impl From<CatalogProduct> for PublicProduct {
    fn from(p: CatalogProduct) -> Self {
        Self {
            id: p.product_id,
            name: p.name,
            description: p.description,
            sizes: p.sizes.0,
            default_size_id: p.default_size_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Catalog {
    pub products: Vec<PublicProduct>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[garde(custom(not_blank))]
    pub product_id: Option<String>,
    #[garde(custom(not_blank))]
    pub name: Option<String>,
    #[garde(custom(not_blank))]
    pub description: Option<String>,
    #[garde(required, length(min = 1))]
    pub sizes: Option<Vec<ProductSize>>,
    #[garde(custom(not_blank))]
    pub default_size_id: Option<String>,
    #[garde(skip)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sizes: Option<Vec<ProductSize>>,
    pub default_size_id: Option<String>,
    pub sort_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_product_uses_slug_as_id() {
        let row = CatalogProduct {
            id: Uuid::new_v4(),
            product_id: "a2-ghee".to_string(),
            name: "A2 Desi Cow Ghee".to_string(),
            description: "Small batch".to_string(),
            sizes: Json(vec![ProductSize {
                id: "500ml".to_string(),
                label: "500 ml".to_string(),
                price: 1699,
                inr: "₹1,699".to_string(),
            }]),
            default_size_id: "500ml".to_string(),
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let public = PublicProduct::from(row);
        let value = serde_json::to_value(&public).unwrap();
        assert_eq!(value["id"], "a2-ghee");
        assert_eq!(value["defaultSizeId"], "500ml");
        assert_eq!(value["sizes"][0]["price"], 1699);
    }

    #[test]
    fn test_create_requires_sizes() {
        let req: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "productId": "wild-honey",
            "name": "Wild Forest Honey",
            "description": "Raw",
            "sizes": [],
            "defaultSizeId": "250g"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
