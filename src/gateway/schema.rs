// SPDX-License-Identifier: GPL-3.0-only

//! One-time catalog setup: tables, indexes and the photo bucket
//!
//! SQL goes through an `exec_sql` RPC function that must already exist in
//! the database. Every statement is idempotent, so setup can be rerun.

use super::{GatewayError, GatewayResult, SupabaseGateway};
use crate::constants::storage::{ALLOWED_MIME_TYPES, MAX_OBJECT_BYTES};
use serde_json::json;
use tracing::{info, warn};

/// SKU reference table
pub const SKUS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS skus (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  key VARCHAR(100) NOT NULL UNIQUE,
  display_name VARCHAR(255) NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);";

/// Products table; SKU and serial number are each unique
pub const PRODUCTS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS products (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  sku VARCHAR(100) NOT NULL UNIQUE,
  serial_number VARCHAR(100) NOT NULL UNIQUE,
  name VARCHAR(255),
  description TEXT,
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);";

/// Photos reference their product and go with it
pub const PRODUCT_PHOTOS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS product_photos (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
  photo_url TEXT NOT NULL,
  photo_name VARCHAR(255) NOT NULL,
  taken_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);";

pub const INDEXES_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_products_sku ON products(sku);
CREATE INDEX IF NOT EXISTS idx_products_serial_number ON products(serial_number);
CREATE INDEX IF NOT EXISTS idx_product_photos_product_id ON product_photos(product_id);";

/// Outcome of one setup step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupStep {
    pub name: &'static str,
    pub result: Result<(), String>,
}

/// Bucket creation failures that mean the bucket is already there
pub fn is_already_exists(err: &GatewayError) -> bool {
    err.message().to_lowercase().contains("already exists")
}

impl SupabaseGateway {
    /// Run a SQL script through the `exec_sql` RPC function
    pub async fn exec_sql(&self, sql: &str) -> GatewayResult<()> {
        let request = self
            .post(&self.rest_url("rpc/exec_sql"))
            .json(&json!({ "sql": sql }));
        self.send(request).await?;
        Ok(())
    }

    /// Create the public photo bucket; an existing bucket counts as success
    pub async fn create_bucket(&self) -> GatewayResult<()> {
        let request = self.post(&self.storage_url("bucket")).json(&json!({
            "id": self.bucket(),
            "name": self.bucket(),
            "public": true,
            "allowed_mime_types": ALLOWED_MIME_TYPES,
            "file_size_limit": MAX_OBJECT_BYTES,
        }));

        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                info!(bucket = %self.bucket(), "Bucket already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Create tables, indexes and the bucket
    ///
    /// Steps run in order and a failed step does not stop the later ones;
    /// every outcome is returned.
    pub async fn setup(&self) -> Vec<SetupStep> {
        let mut steps = Vec::new();

        for (name, sql) in [
            ("skus table", SKUS_TABLE_SQL),
            ("products table", PRODUCTS_TABLE_SQL),
            ("product_photos table", PRODUCT_PHOTOS_TABLE_SQL),
            ("indexes", INDEXES_SQL),
        ] {
            let result = self.exec_sql(sql).await.map_err(|e| e.to_string());
            if let Err(e) = &result {
                warn!(step = name, error = %e, "Setup step failed");
            }
            steps.push(SetupStep { name, result });
        }

        let result = self.create_bucket().await.map_err(|e| e.to_string());
        if let Err(e) = &result {
            warn!(step = "bucket", error = %e, "Setup step failed");
        }
        steps.push(SetupStep {
            name: "storage bucket",
            result,
        });

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_detection() {
        let err = GatewayError::Rejected {
            status: 409,
            message: "The resource already exists".into(),
        };
        assert!(is_already_exists(&err));
        assert!(!is_already_exists(&GatewayError::Transport("timeout".into())));
    }

    #[test]
    fn test_photos_cascade_with_product() {
        assert!(PRODUCT_PHOTOS_TABLE_SQL.contains("REFERENCES products(id) ON DELETE CASCADE"));
    }
}
