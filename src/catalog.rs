//! Product catalog held by the state machine for the lifetime of the run.
//!
//! Built once at boot by [`ProductStore::load`](crate::storage::ProductStore::load)
//! from the EEPROM image plus the names in [`MachineConfig`].  Nothing
//! mutates it afterwards.

use heapless::{String, Vec};

use crate::config::{MachineConfig, MAX_PRODUCTS, PRODUCT_NAME_LEN};

/// One selectable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String<PRODUCT_NAME_LEN>,
    /// Price in credit units.
    pub price: u8,
    pub available: bool,
    /// Dispense time in calibration units.
    pub unit_dispense_time: u8,
    /// Sales counter as read from storage at boot (never written back).
    pub sales_count: u8,
}

impl Product {
    /// Dispense duration for a given calibration unit length.
    pub fn dispense_ms(&self, unit_ms: u32) -> u32 {
        u32::from(self.unit_dispense_time) * unit_ms
    }
}

/// Ordered product table, index 0 = key `A`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product, MAX_PRODUCTS>,
}

impl Catalog {
    /// Catalog straight from the configuration defaults (no storage overlay).
    pub fn from_config(config: &MachineConfig) -> Self {
        let mut products = Vec::new();
        for def in &config.products {
            // Same capacity on both sides.
            let _ = products.push(Product {
                name: def.name.clone(),
                price: def.price,
                available: def.available,
                unit_dispense_time: def.unit_dispense_time,
                sales_count: 0,
            });
        }
        Self { products }
    }

    /// Fallback used when storage cannot be read: the configured names, but
    /// nothing can be bought.
    pub fn all_unavailable(config: &MachineConfig) -> Self {
        let mut catalog = Self::from_config(config);
        for p in catalog.products.iter_mut() {
            p.available = false;
        }
        catalog
    }

    /// Append a product.  Returns it back if the catalog is full.
    pub fn push(&mut self, product: Product) -> Result<(), Product> {
        self.products.push(product)
    }

    pub fn get(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products currently purchasable.
    pub fn available_count(&self) -> usize {
        self.products.iter().filter(|p| p.available).count()
    }
}
