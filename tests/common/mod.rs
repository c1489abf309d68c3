// SPDX-License-Identifier: MPL-2.0

//! In-memory catalog shared by the integration tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use qa_camera::gateway::{
    CatalogGateway, GatewayError, GatewayResult, NewProduct, NewProductPhoto, Product,
    ProductPhoto, Sku,
};
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Catalog {
    skus: Vec<Sku>,
    products: Vec<Product>,
    photos: Vec<ProductPhoto>,
    objects: Vec<(String, String, usize)>,
    fail_skus: bool,
    fail_uploads: HashSet<usize>,
    uploads_seen: usize,
    calls: usize,
}

/// Catalog gateway backed by vectors, with switchable failures
///
/// Products get strictly increasing `created_at` values so ordering is
/// deterministic.
#[derive(Default)]
pub struct FakeGateway {
    inner: Mutex<Catalog>,
}

impl FakeGateway {
    /// Catalog seeded with a few SKUs, including SF-100 "Sofa Classic"
    pub fn new() -> Self {
        let gateway = Self::default();
        {
            let mut catalog = gateway.inner.lock().unwrap();
            catalog.skus = vec![
                sku("TB-200", "Dining Table Oak"),
                sku("SF-100", "Sofa Classic"),
                sku("CH-050", "Chair Nordic"),
            ];
        }
        gateway
    }

    /// Make the SKU list request fail
    pub fn failing_skus(self) -> Self {
        self.inner.lock().unwrap().fail_skus = true;
        self
    }

    /// Reject the upload with this zero-based position among all uploads
    pub fn fail_upload(self, nth: usize) -> Self {
        self.inner.lock().unwrap().fail_uploads.insert(nth);
        self
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls
    }

    pub fn products(&self) -> Vec<Product> {
        self.inner.lock().unwrap().products.clone()
    }

    pub fn photos(&self) -> Vec<ProductPhoto> {
        self.inner.lock().unwrap().photos.clone()
    }

    /// Stored objects as (name, content type, size)
    pub fn objects(&self) -> Vec<(String, String, usize)> {
        self.inner.lock().unwrap().objects.clone()
    }

    /// Insert a product directly, bypassing uniqueness checks
    pub fn seed_product(&self, sku: &str, serial: &str, name: Option<&str>) -> Product {
        let mut catalog = self.inner.lock().unwrap();
        let product = build_product(&catalog, sku, serial, name);
        catalog.products.push(product.clone());
        product
    }
}

fn sku(key: &str, name: &str) -> Sku {
    Sku {
        id: None,
        key: key.into(),
        display_name: name.into(),
    }
}

fn build_product(catalog: &Catalog, sku: &str, serial: &str, name: Option<&str>) -> Product {
    let created_at = Utc::now() + Duration::seconds(catalog.products.len() as i64);
    Product {
        id: Uuid::new_v4(),
        sku: sku.into(),
        serial_number: serial.into(),
        name: name.map(Into::into),
        description: None,
        created_at,
        updated_at: created_at,
    }
}

fn rejected(status: u16, message: &str) -> GatewayError {
    GatewayError::Rejected {
        status,
        message: message.into(),
    }
}

impl CatalogGateway for FakeGateway {
    async fn list_skus(&self) -> GatewayResult<Vec<Sku>> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.calls += 1;
        if catalog.fail_skus {
            return Err(rejected(500, "relation \"skus\" does not exist"));
        }
        let mut skus = catalog.skus.clone();
        skus.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(skus)
    }

    async fn create_product(&self, product: &NewProduct) -> GatewayResult<Product> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.calls += 1;
        if catalog.products.iter().any(|p| p.sku == product.sku) {
            return Err(rejected(
                409,
                "duplicate key value violates unique constraint \"products_sku_key\"",
            ));
        }
        if catalog
            .products
            .iter()
            .any(|p| p.serial_number == product.serial_number)
        {
            return Err(rejected(
                409,
                "duplicate key value violates unique constraint \"products_serial_number_key\"",
            ));
        }

        let mut row = build_product(
            &catalog,
            &product.sku,
            &product.serial_number,
            product.name.as_deref(),
        );
        row.description = product.description.clone();
        catalog.products.push(row.clone());
        Ok(row)
    }

    async fn list_products(&self) -> GatewayResult<Vec<Product>> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.calls += 1;
        let mut products = catalog.products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn list_photos(&self, product_id: Uuid) -> GatewayResult<Vec<ProductPhoto>> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.calls += 1;
        let mut photos: Vec<_> = catalog
            .photos
            .iter()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(photos)
    }

    async fn upload_photo(
        &self,
        object_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> GatewayResult<String> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.calls += 1;
        let nth = catalog.uploads_seen;
        catalog.uploads_seen += 1;
        if catalog.fail_uploads.contains(&nth) {
            return Err(rejected(413, "Payload too large"));
        }
        catalog
            .objects
            .push((object_name.into(), content_type.into(), bytes.len()));
        Ok(format!(
            "https://demo.supabase.co/storage/v1/object/public/product-photos/{}",
            object_name
        ))
    }

    async fn link_photo(&self, photo: &NewProductPhoto) -> GatewayResult<ProductPhoto> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.calls += 1;
        if !catalog.products.iter().any(|p| p.id == photo.product_id) {
            return Err(rejected(409, "violates foreign key constraint"));
        }
        let created_at = Utc::now() + Duration::seconds(catalog.photos.len() as i64);
        let row = ProductPhoto {
            id: Uuid::new_v4(),
            product_id: photo.product_id,
            photo_url: photo.photo_url.clone(),
            photo_name: photo.photo_name.clone(),
            taken_at: photo.taken_at,
            created_at,
        };
        catalog.photos.push(row.clone());
        Ok(row)
    }
}
