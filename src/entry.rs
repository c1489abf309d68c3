// SPDX-License-Identifier: GPL-3.0-only

//! Product entry form
//!
//! Holds the fields and pending photos for one product, validates them and
//! submits the product followed by its photos, one request at a time.

use crate::errors::{AppError, AppResult, ValidationError};
use crate::gateway::{CatalogGateway, NewProduct, NewProductPhoto, Product, ProductPhoto, Sku};
use crate::pipelines::photo::CapturedImage;
use crate::storage::{self, ImageKind, PickedImage};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shown when the SKU reference list cannot be fetched
pub const SKU_LOAD_ERROR: &str = "Failed to load SKU options";

/// Field labels used in validation messages
pub const SKU_FIELD: &str = "Product SKU";
pub const SERIAL_FIELD: &str = "Serial number";

/// Where a pending photo came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    Camera,
    Library(PathBuf),
}

/// A photo waiting to be uploaded with the product
#[derive(Clone, PartialEq, Eq)]
pub struct PendingPhoto {
    pub data: Vec<u8>,
    pub kind: ImageKind,
    pub source: PhotoSource,
    pub taken_at: DateTime<Utc>,
}

impl fmt::Debug for PendingPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPhoto")
            .field("bytes", &self.data.len())
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("taken_at", &self.taken_at)
            .finish()
    }
}

impl PendingPhoto {
    /// Short label for lists
    pub fn label(&self) -> String {
        let size_kb = self.data.len().div_ceil(1024);
        match &self.source {
            PhotoSource::Camera => format!(
                "camera {} ({} KB)",
                self.taken_at.format("%H:%M:%S"),
                size_kb
            ),
            PhotoSource::Library(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("{} ({} KB)", name, size_kb)
            }
        }
    }
}

impl From<CapturedImage> for PendingPhoto {
    fn from(image: CapturedImage) -> Self {
        Self {
            data: image.data,
            kind: ImageKind::Jpeg,
            source: PhotoSource::Camera,
            taken_at: image.captured_at,
        }
    }
}

impl From<PickedImage> for PendingPhoto {
    fn from(image: PickedImage) -> Self {
        Self {
            data: image.data,
            kind: image.kind,
            source: PhotoSource::Library(image.path),
            taken_at: Utc::now(),
        }
    }
}

/// A photo that did not make it into the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFailure {
    /// Position in the pending list, starting at 0
    pub index: usize,
    pub message: String,
}

/// Result of a submission whose product was created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub product: Product,
    pub linked: Vec<ProductPhoto>,
    pub failed: Vec<PhotoFailure>,
}

impl SubmitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary for the status bar
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Product {} created with {} photo{}",
            self.product.sku,
            self.linked.len(),
            if self.linked.len() == 1 { "" } else { "s" }
        );
        if !self.failed.is_empty() {
            text.push_str(&format!("; {} failed", self.failed.len()));
        }
        text
    }
}

/// Object name for the `index`-th photo of a product
pub fn photo_object_name(product_id: Uuid, index: usize, at: DateTime<Utc>, ext: &str) -> String {
    format!(
        "{}_photo_{}_{}.{}",
        product_id,
        index,
        at.timestamp_millis(),
        ext
    )
}

fn trimmed_or_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Entry form state
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub sku: String,
    pub serial_number: String,
    pub name: String,
    pub description: String,
    photos: Vec<PendingPhoto>,
    skus: Vec<Sku>,
    sku_error: Option<String>,
}

impl ProductForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn photos(&self) -> &[PendingPhoto] {
        &self.photos
    }

    pub fn skus(&self) -> &[Sku] {
        &self.skus
    }

    /// Set when the SKU list failed to load
    pub fn sku_error(&self) -> Option<&str> {
        self.sku_error.as_deref()
    }

    /// Fetch the SKU options, ordered by key
    pub async fn load_skus<G: CatalogGateway>(&mut self, gateway: &G) -> AppResult<usize> {
        match gateway.list_skus().await {
            Ok(mut skus) => {
                skus.sort_by(|a, b| a.key.cmp(&b.key));
                debug!(count = skus.len(), "Loaded SKU options");
                self.skus = skus;
                self.sku_error = None;
                Ok(self.skus.len())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load SKU options");
                self.sku_error = Some(SKU_LOAD_ERROR.to_string());
                Err(AppError::Other(SKU_LOAD_ERROR.to_string()))
            }
        }
    }

    /// Set the SKU and fill the name from the matching reference entry
    ///
    /// An unknown key still sets the SKU and leaves the name alone.
    pub fn select_sku(&mut self, key: &str) {
        self.sku = key.to_string();
        if let Some(sku) = self.skus.iter().find(|s| s.key == key) {
            self.name = sku.display_name.clone();
        }
    }

    /// Move the SKU selection through the loaded list, wrapping around
    pub fn cycle_sku(&mut self, forward: bool) {
        if self.skus.is_empty() {
            return;
        }
        let len = self.skus.len();
        let next = match self.skus.iter().position(|s| s.key == self.sku) {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        let key = self.skus[next].key.clone();
        self.select_sku(&key);
    }

    pub fn add_captured(&mut self, image: CapturedImage) {
        debug!(bytes = image.data.len(), "Added camera photo");
        self.photos.push(image.into());
    }

    /// Add an existing image file
    pub async fn add_from_file(&mut self, path: PathBuf) -> Result<(), ValidationError> {
        let picked = storage::read_image_file(path).await?;
        debug!(path = %picked.path.display(), "Added library photo");
        self.photos.push(picked.into());
        Ok(())
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<PendingPhoto, ValidationError> {
        if index >= self.photos.len() {
            return Err(ValidationError::NoSuchPhoto(index));
        }
        Ok(self.photos.remove(index))
    }

    /// Check required fields and build the insert payload
    pub fn validate(&self) -> Result<NewProduct, ValidationError> {
        let sku = trimmed_or_none(&self.sku).ok_or(ValidationError::MissingField(SKU_FIELD))?;
        let serial_number = trimmed_or_none(&self.serial_number)
            .ok_or(ValidationError::MissingField(SERIAL_FIELD))?;

        Ok(NewProduct {
            sku,
            serial_number,
            name: trimmed_or_none(&self.name),
            description: trimmed_or_none(&self.description),
        })
    }

    /// Clear fields and photos; the SKU list stays loaded
    pub fn reset(&mut self) {
        self.sku.clear();
        self.serial_number.clear();
        self.name.clear();
        self.description.clear();
        self.photos.clear();
    }

    /// Create the product, then upload and link each photo in order
    ///
    /// If the product cannot be created nothing is uploaded and the form is
    /// kept. Once the product exists, photo failures are collected in the
    /// report and the form is reset.
    pub async fn submit<G: CatalogGateway>(&mut self, gateway: &G) -> AppResult<SubmitReport> {
        let new_product = self.validate()?;
        let product = gateway.create_product(&new_product).await?;
        info!(id = %product.id, sku = %product.sku, photos = self.photos.len(), "Product created");

        let mut linked = Vec::with_capacity(self.photos.len());
        let mut failed = Vec::new();

        for (index, photo) in self.photos.iter().enumerate() {
            match upload_and_link(gateway, &product, index, photo).await {
                Ok(row) => linked.push(row),
                Err(e) => {
                    warn!(index, error = %e, "Photo upload failed");
                    failed.push(PhotoFailure {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.reset();
        Ok(SubmitReport {
            product,
            linked,
            failed,
        })
    }
}

async fn upload_and_link<G: CatalogGateway>(
    gateway: &G,
    product: &Product,
    index: usize,
    photo: &PendingPhoto,
) -> AppResult<ProductPhoto> {
    let object_name = photo_object_name(product.id, index, Utc::now(), photo.kind.extension());
    let photo_url = gateway
        .upload_photo(&object_name, photo.kind.mime_type(), photo.data.clone())
        .await?;

    let row = gateway
        .link_photo(&NewProductPhoto {
            product_id: product.id,
            photo_url,
            photo_name: object_name,
            taken_at: photo.taken_at,
        })
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sku(key: &str, name: &str) -> Sku {
        Sku {
            id: None,
            key: key.into(),
            display_name: name.into(),
        }
    }

    #[test]
    fn test_object_name_format() {
        let id = Uuid::nil();
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            photo_object_name(id, 0, at, "jpg"),
            "00000000-0000-0000-0000-000000000000_photo_0_1700000000123.jpg"
        );
    }

    #[test]
    fn test_validate_trims_and_nulls() {
        let form = ProductForm {
            sku: "  SF-100 ".into(),
            serial_number: "SN-1".into(),
            name: "   ".into(),
            ..Default::default()
        };
        let product = form.validate().unwrap();
        assert_eq!(product.sku, "SF-100");
        assert_eq!(product.name, None);
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_validate_requires_sku_then_serial() {
        let mut form = ProductForm::new();
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField(SKU_FIELD))
        );
        form.sku = "SF-100".into();
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField(SERIAL_FIELD))
        );
    }

    #[test]
    fn test_cycle_sku_wraps() {
        let mut form = ProductForm {
            skus: vec![sku("A-1", "Armchair"), sku("B-2", "Bench")],
            ..Default::default()
        };
        form.cycle_sku(true);
        assert_eq!(form.sku, "A-1");
        assert_eq!(form.name, "Armchair");
        form.cycle_sku(true);
        assert_eq!(form.sku, "B-2");
        form.cycle_sku(true);
        assert_eq!(form.sku, "A-1");
        form.cycle_sku(false);
        assert_eq!(form.sku, "B-2");
    }

    #[test]
    fn test_remove_photo_out_of_range() {
        let mut form = ProductForm::new();
        assert_eq!(form.remove_photo(0), Err(ValidationError::NoSuchPhoto(0)));
    }
}
