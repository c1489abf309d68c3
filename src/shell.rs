// SPDX-License-Identifier: GPL-3.0-only

//! Top-level navigation between the home, entry and gallery views

use crate::constants::shell::RECENT_PRODUCTS;
use crate::gateway::Product;
use std::collections::VecDeque;

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Log,
    Gallery,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Log => "Log Product",
            View::Gallery => "Gallery",
        }
    }
}

/// Most recently created products, newest first
#[derive(Debug, Clone, Default)]
pub struct RecentProducts {
    items: VecDeque<Product>,
}

impl RecentProducts {
    /// Record a product; an entry with the same id moves to the front
    pub fn push(&mut self, product: Product) {
        self.items.retain(|p| p.id != product.id);
        self.items.push_front(product);
        self.items.truncate(RECENT_PRODUCTS);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Shell {
    view: View,
    recent: RecentProducts,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn navigate(&mut self, view: View) {
        self.view = view;
    }

    pub fn recent(&self) -> &RecentProducts {
        &self.recent
    }

    /// Remember a newly created product and show the gallery
    pub fn product_created(&mut self, product: Product) {
        self.recent.push(product);
        self.view = View::Gallery;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn product(sku: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: sku.into(),
            serial_number: format!("SN-{}", sku),
            name: None,
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recent_keeps_five_newest_first() {
        let mut recent = RecentProducts::default();
        for i in 0..7 {
            recent.push(product(&format!("P-{}", i)));
        }
        let skus: Vec<_> = recent.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, ["P-6", "P-5", "P-4", "P-3", "P-2"]);
    }

    #[test]
    fn test_product_created_switches_to_gallery() {
        let mut shell = Shell::new();
        shell.navigate(View::Log);
        shell.product_created(product("SF-100"));
        assert_eq!(shell.view(), View::Gallery);
        assert_eq!(shell.recent().len(), 1);
    }
}
