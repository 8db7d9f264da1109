//! Persistent product table.
//!
//! The machine keeps its per-product settings in a small byte-addressed
//! image (an EEPROM on the original board, an NVS blob on the ESP32):
//!
//! ```text
//!  0        10       20       30       40     44
//!  ├ price ─┼ sales ─┼ avail ─┼ timer ─┼ total ┤
//!  │ u8 × N │ u8 × N │ u8 × N │ u8 × N │ u32BE │
//! ```
//!
//! Price, availability and timer are read once at boot.  Sales counters are
//! readable but nothing writes them back after a purchase.

use log::{info, warn};

use crate::app::ports::{ByteStoragePort, StorageError};
use crate::catalog::{Catalog, Product};
use crate::config::{MAX_PRODUCTS, MachineConfig};

const N: u16 = MAX_PRODUCTS as u16;

pub const PRICE_BASE: u16 = 0;
pub const SALES_BASE: u16 = PRICE_BASE + N;
pub const AVAILABILITY_BASE: u16 = SALES_BASE + N;
pub const TIMER_BASE: u16 = AVAILABILITY_BASE + N;
pub const TOTAL_SALES_BASE: u16 = TIMER_BASE + N;
pub const TOTAL_SALES_LEN: u16 = 4;

/// Size of the whole image in bytes.
pub const IMAGE_LEN: u16 = TOTAL_SALES_BASE + TOTAL_SALES_LEN;

/// Value an erased cell reads back as.
pub const ERASED: u8 = 0xFF;

/// Availability byte meaning "in stock".  Anything else is unavailable.
pub const AVAILABLE: u8 = 1;

fn slot(base: u16, index: usize) -> Result<u16, StorageError> {
    u16::try_from(index)
        .ok()
        .filter(|&i| i < N)
        .map(|i| base + i)
        .ok_or(StorageError::OutOfRange(base.saturating_add(N)))
}

/// Stateless accessor over a [`ByteStoragePort`].
pub struct ProductStore;

impl ProductStore {
    /// Build the catalog: names from `config`, everything else from storage.
    ///
    /// A product is only available when its availability byte is exactly
    /// [`AVAILABLE`] and its timer byte is calibrated (neither 0 nor
    /// [`ERASED`]).  Any read error aborts the whole load.
    pub fn load<S>(storage: &S, config: &MachineConfig) -> Result<Catalog, StorageError>
    where
        S: ByteStoragePort + ?Sized,
    {
        let mut catalog = Catalog::default();
        for (i, def) in config.products.iter().enumerate() {
            let price = storage.read_byte(slot(PRICE_BASE, i)?)?;
            let sales_count = storage.read_byte(slot(SALES_BASE, i)?)?;
            let flag = storage.read_byte(slot(AVAILABILITY_BASE, i)?)?;
            let timer = storage.read_byte(slot(TIMER_BASE, i)?)?;

            let calibrated = timer != 0 && timer != ERASED;
            let available = flag == AVAILABLE && calibrated;
            if flag == AVAILABLE && !calibrated {
                warn!(
                    "Product {} ({}) marked available but timer is {}, disabling",
                    i, def.name, timer
                );
            }

            let product = Product {
                name: def.name.clone(),
                price,
                available,
                unit_dispense_time: timer,
                sales_count,
            };
            if catalog.push(product).is_err() {
                break;
            }
        }

        info!(
            "Catalog loaded: {} products, {} available",
            catalog.len(),
            catalog.available_count()
        );
        Ok(catalog)
    }

    /// [`load`](Self::load), falling back to an all-unavailable catalog if
    /// storage cannot be read.
    pub fn load_or_disabled<S>(storage: &S, config: &MachineConfig) -> Catalog
    where
        S: ByteStoragePort + ?Sized,
    {
        match Self::load(storage, config) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Product storage unreadable ({}), all products disabled", e);
                Catalog::all_unavailable(config)
            }
        }
    }

    /// Write price, availability and timer for every product in `config`.
    /// Sales and total-sales cells are left as they are.
    pub fn provision<S>(storage: &mut S, config: &MachineConfig) -> Result<(), StorageError>
    where
        S: ByteStoragePort + ?Sized,
    {
        for (i, def) in config.products.iter().enumerate() {
            storage.write_byte(slot(PRICE_BASE, i)?, def.price)?;
            storage.write_byte(slot(AVAILABILITY_BASE, i)?, u8::from(def.available))?;
            storage.write_byte(slot(TIMER_BASE, i)?, def.unit_dispense_time)?;
        }
        info!("Provisioned {} products", config.products.len());
        Ok(())
    }

    /// Stored sales counter for one product.
    pub fn read_sales<S>(storage: &S, index: usize) -> Result<u8, StorageError>
    where
        S: ByteStoragePort + ?Sized,
    {
        storage.read_byte(slot(SALES_BASE, index)?)
    }

    /// Stored machine-wide sales total (big-endian u32).
    pub fn read_total_sales<S>(storage: &S) -> Result<u32, StorageError>
    where
        S: ByteStoragePort + ?Sized,
    {
        let mut bytes = [0u8; TOTAL_SALES_LEN as usize];
        for (offset, b) in (0u16..).zip(bytes.iter_mut()) {
            *b = storage.read_byte(TOTAL_SALES_BASE + offset)?;
        }
        Ok(u32::from_be_bytes(bytes))
    }
}
