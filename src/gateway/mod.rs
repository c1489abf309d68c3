// SPDX-License-Identifier: GPL-3.0-only

//! Remote catalog gateway
//!
//! Products, their photos and the SKU reference list live in a hosted
//! PostgREST database; photo files live in a public object-storage bucket.
//! Screens talk to it through [`CatalogGateway`] so tests can substitute an
//! in-memory catalog.

pub mod schema;
pub mod supabase;

pub use supabase::SupabaseGateway;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::future::Future;
use uuid::Uuid;

/// Result type for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway failure, carrying the text to show the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway answered with an error status
    Rejected { status: u16, message: String },
    /// The request did not complete (DNS, TLS, timeout, connection reset)
    Transport(String),
    /// The response could not be understood
    Decode(String),
}

impl GatewayError {
    /// Operator-facing text, as reported by the gateway
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Rejected { message, .. } => message,
            GatewayError::Transport(message) | GatewayError::Decode(message) => message,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GatewayError {}

/// SKU reference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: Option<String>,
    pub key: String,
    pub display_name: String,
}

/// Accept either a string or a numeric id column
fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
    )
}

/// A cataloged product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub serial_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Name if set, otherwise the SKU
    pub fn title(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.sku)
    }
}

/// Insert payload for a product; absent optional fields are sent as null
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub sku: String,
    pub serial_number: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A photo linked to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPhoto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub photo_url: String,
    pub photo_name: String,
    pub taken_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload linking an uploaded object to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProductPhoto {
    pub product_id: Uuid,
    pub photo_url: String,
    pub photo_name: String,
    pub taken_at: DateTime<Utc>,
}

/// Catalog operations used by the screens
pub trait CatalogGateway: Send + Sync {
    /// SKU reference list ordered by key
    fn list_skus(&self) -> impl Future<Output = GatewayResult<Vec<Sku>>> + Send;

    /// Insert a product and return the stored row
    fn create_product(
        &self,
        product: &NewProduct,
    ) -> impl Future<Output = GatewayResult<Product>> + Send;

    /// All products, newest first
    fn list_products(&self) -> impl Future<Output = GatewayResult<Vec<Product>>> + Send;

    /// Photos of one product, newest first
    fn list_photos(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = GatewayResult<Vec<ProductPhoto>>> + Send;

    /// Store an object in the photo bucket and return its public URL
    fn upload_photo(
        &self,
        object_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = GatewayResult<String>> + Send;

    /// Insert a photo row
    fn link_photo(
        &self,
        photo: &NewProductPhoto,
    ) -> impl Future<Output = GatewayResult<ProductPhoto>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_sends_nulls() {
        let product = NewProduct {
            sku: "SF-100".into(),
            serial_number: "SN-1".into(),
            name: None,
            description: None,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert!(json["name"].is_null());
        assert!(json["description"].is_null());
    }

    #[test]
    fn test_sku_id_accepts_numbers() {
        let sku: Sku =
            serde_json::from_str(r#"{"id": 7, "key": "SF-100", "display_name": "Sofa Classic"}"#)
                .unwrap();
        assert_eq!(sku.id.as_deref(), Some("7"));

        let sku: Sku =
            serde_json::from_str(r#"{"key": "SF-100", "display_name": "Sofa Classic"}"#).unwrap();
        assert_eq!(sku.id, None);
    }

    #[test]
    fn test_product_parses_postgrest_timestamps() {
        let product: Product = serde_json::from_str(
            r#"{
                "id": "5b0e4c4e-8d47-4c43-9d1c-1f0a3d3f1e11",
                "sku": "SF-100",
                "serial_number": "SN-1",
                "name": null,
                "created_at": "2024-05-01T10:00:00.123456+00:00",
                "updated_at": "2024-05-01T10:00:00+00:00"
            }"#,
        )
        .unwrap();
        assert_eq!(product.title(), "SF-100");
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_error_display_is_verbatim() {
        let err = GatewayError::Rejected {
            status: 409,
            message: "duplicate key value violates unique constraint \"products_sku_key\"".into(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint \"products_sku_key\""
        );
    }
}
