// SPDX-License-Identifier: GPL-3.0-only

//! Product gallery: browse cataloged products and their photos

use crate::errors::AppResult;
use crate::gateway::{CatalogGateway, Product, ProductPhoto};
use tracing::{debug, warn};
use uuid::Uuid;

/// Gallery view state
///
/// Load failures are kept as text for display instead of being returned.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    products: Vec<Product>,
    search: String,
    selected: Option<Uuid>,
    photos: Vec<ProductPhoto>,
    error: Option<String>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload the product list, newest first
    pub async fn refresh<G: CatalogGateway>(&mut self, gateway: &G) {
        match gateway.list_products().await {
            Ok(mut products) => {
                products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                debug!(count = products.len(), "Loaded products");
                if let Some(id) = self.selected
                    && !products.iter().any(|p| p.id == id)
                {
                    self.clear_selection();
                }
                self.products = products;
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load products");
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Products matching the search term on SKU, name or serial number
    pub fn filtered(&self) -> Vec<&Product> {
        let term = self.search.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| term.is_empty() || matches_term(p, &term))
            .collect()
    }

    /// Select a product and load its photos, newest first
    pub async fn select<G: CatalogGateway>(&mut self, gateway: &G, product_id: Uuid) {
        self.selected = Some(product_id);
        self.photos.clear();
        match gateway.list_photos(product_id).await {
            Ok(mut photos) => {
                photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                debug!(product = %product_id, count = photos.len(), "Loaded photos");
                self.photos = photos;
                self.error = None;
            }
            Err(e) => {
                warn!(product = %product_id, error = %e, "Failed to load photos");
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.photos.clear();
    }

    pub fn selected(&self) -> Option<&Product> {
        let id = self.selected?;
        self.products.iter().find(|p| p.id == id)
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn photos(&self) -> &[ProductPhoto] {
        &self.photos
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn matches_term(product: &Product, term: &str) -> bool {
    product.sku.to_lowercase().contains(term)
        || product.serial_number.to_lowercase().contains(term)
        || product
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(term))
}

/// Open a photo in the system browser
pub fn open_photo(photo: &ProductPhoto) -> AppResult<()> {
    open::that_detached(&photo.photo_url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(sku: &str, serial: &str, name: Option<&str>) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: sku.into(),
            serial_number: serial.into(),
            name: name.map(Into::into),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_matches_any_field_case_insensitive() {
        let gallery = Gallery {
            products: vec![
                product("SF-100", "SN-001", Some("Sofa Classic")),
                product("TB-200", "SN-777", None),
            ],
            ..Default::default()
        };

        let mut g = gallery.clone();
        g.set_search("sofa");
        assert_eq!(g.filtered().len(), 1);

        g.set_search("sn-777");
        assert_eq!(g.filtered()[0].sku, "TB-200");

        g.set_search("tb");
        assert_eq!(g.filtered().len(), 1);

        g.set_search("  ");
        assert_eq!(g.filtered().len(), 2);

        g.set_search("chair");
        assert!(g.filtered().is_empty());
    }
}
