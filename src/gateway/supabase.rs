// SPDX-License-Identifier: GPL-3.0-only

//! Supabase-compatible gateway over plain HTTP
//!
//! PostgREST for rows, the storage API for photo objects. Every request
//! carries the configured key as both `apikey` and bearer token. Failures
//! are surfaced with the gateway's own message and never retried.

use super::{
    CatalogGateway, GatewayError, GatewayResult, NewProduct, NewProductPhoto, Product,
    ProductPhoto, Sku,
};
use crate::config::GatewayConfig;
use crate::constants::gateway::{REQUEST_TIMEOUT, REST_PATH, STORAGE_PATH};
use crate::errors::AppResult;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(format!("Unexpected response from server: {}", err))
        } else {
            GatewayError::Transport(format!("Network error: {}", err))
        }
    }
}

/// Pull the human-readable message out of an error response body
///
/// PostgREST uses `message`, the storage API `error` or `message`, auth
/// endpoints `msg`. Non-JSON bodies are returned as they are; an empty body
/// falls back to the status line.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error", "msg"] {
            if let Some(text) = json.get(field).and_then(|v| v.as_str())
                && !text.is_empty()
            {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.to_string()
    }
}

/// HTTP client for a Supabase project
#[derive(Debug, Clone)]
pub struct SupabaseGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseGateway {
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transport(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Build from configuration; fails when URL or key is missing
    pub fn from_config(config: &GatewayConfig) -> AppResult<Self> {
        let (url, key) = config.credentials()?;
        Ok(Self::new(url, key, &config.bucket)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub(super) fn rest_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, path)
    }

    pub(super) fn storage_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, STORAGE_PATH, path)
    }

    /// Public URL of an object in the photo bucket
    pub fn public_url(&self, object_name: &str) -> String {
        self.storage_url(&format!("object/public/{}/{}", self.bucket, object_name))
    }

    pub(super) fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    pub(super) fn get(&self, url: &str) -> RequestBuilder {
        self.authorized(self.http.get(url))
    }

    pub(super) fn post(&self, url: &str) -> RequestBuilder {
        self.authorized(self.http.post(url))
    }

    /// Send and turn non-success statuses into [`GatewayError::Rejected`]
    pub(super) async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!(status = status.as_u16(), message = %message, "Gateway rejected request");
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, url: &str) -> GatewayResult<Vec<T>> {
        let response = self.send(self.get(url)).await?;
        Ok(response.json().await?)
    }

    /// Insert one row and return its stored representation
    async fn insert_row<B, T>(&self, table: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .post(&self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = self.send(request).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::Decode(format!("Insert into {} returned no row", table)))
    }
}

impl CatalogGateway for SupabaseGateway {
    async fn list_skus(&self) -> GatewayResult<Vec<Sku>> {
        self.fetch_rows(&format!("{}?select=*&order=key.asc", self.rest_url("skus")))
            .await
    }

    async fn create_product(&self, product: &NewProduct) -> GatewayResult<Product> {
        info!(sku = %product.sku, serial = %product.serial_number, "Creating product");
        self.insert_row("products", product).await
    }

    async fn list_products(&self) -> GatewayResult<Vec<Product>> {
        self.fetch_rows(&format!(
            "{}?select=*&order=created_at.desc",
            self.rest_url("products")
        ))
        .await
    }

    async fn list_photos(&self, product_id: Uuid) -> GatewayResult<Vec<ProductPhoto>> {
        self.fetch_rows(&format!(
            "{}?select=*&product_id=eq.{}&order=created_at.desc",
            self.rest_url("product_photos"),
            product_id
        ))
        .await
    }

    async fn upload_photo(
        &self,
        object_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> GatewayResult<String> {
        let size = bytes.len();
        let request = self
            .post(&self.storage_url(&format!("object/{}/{}", self.bucket, object_name)))
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);
        self.send(request).await?;

        debug!(object = %object_name, size, "Photo uploaded");
        Ok(self.public_url(object_name))
    }

    async fn link_photo(&self, photo: &NewProductPhoto) -> GatewayResult<ProductPhoto> {
        self.insert_row("product_photos", photo).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> SupabaseGateway {
        SupabaseGateway::new("https://demo.supabase.co/", "anon", "product-photos").unwrap()
    }

    #[test]
    fn test_urls() {
        let gw = gateway();
        assert_eq!(gw.rest_url("skus"), "https://demo.supabase.co/rest/v1/skus");
        assert_eq!(
            gw.public_url("abc_photo_1_17.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/product-photos/abc_photo_1_17.jpg"
        );
    }

    #[test]
    fn test_error_message_fields() {
        let status = StatusCode::CONFLICT;
        assert_eq!(
            error_message(status, r#"{"code":"23505","message":"duplicate key"}"#),
            "duplicate key"
        );
        assert_eq!(
            error_message(status, r#"{"statusCode":"409","error":"Duplicate","message":""}"#),
            "Duplicate"
        );
        assert_eq!(error_message(status, r#"{"msg":"Invalid JWT"}"#), "Invalid JWT");
        assert_eq!(error_message(status, "upstream timeout"), "upstream timeout");
        assert_eq!(error_message(status, ""), "409 Conflict");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = GatewayConfig::default();
        assert!(SupabaseGateway::from_config(&config).is_err());
    }
}
