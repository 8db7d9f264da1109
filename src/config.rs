//! Machine configuration parameters
//!
//! Everything the controller needs to know that is not stored in the
//! per-product EEPROM image: display language, product names, factory
//! defaults for the product table, and loop timings.
//! Values can be overridden via NVS (see [`NvsAdapter`](crate::adapters::nvs::NvsAdapter)).

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

/// Number of selectable products (one per keypad contact).
pub const MAX_PRODUCTS: usize = 10;

/// Longest product name that fits on one line of the 16×2 display.
pub const PRODUCT_NAME_LEN: usize = 16;

/// Display language for the message catalog and default product names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Spanish,
}

/// Factory definition of one product.
///
/// `price`, `available` and `unit_dispense_time` are only defaults: at boot
/// the values stored in the EEPROM image win (see [`crate::storage`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDef {
    pub name: String<PRODUCT_NAME_LEN>,
    /// Price in credit units.
    pub price: u8,
    pub available: bool,
    /// Dispense time in calibration units (1 = 100 ms, 255 = 25.5 s).
    pub unit_dispense_time: u8,
}

/// Loop timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Coin counter sampling period (milliseconds).
    pub coin_poll_interval_ms: u32,
    /// Delay between the two keypad scans of a debounce pair (milliseconds).
    pub key_settle_ms: u32,
    /// Pause between keypad scans while no key is down (milliseconds).
    pub key_idle_scan_ms: u32,
    /// How long a held message stays on screen (milliseconds).
    pub message_hold_ms: u32,
    /// Length of one dispense calibration unit (milliseconds).
    pub dispense_unit_ms: u32,
    /// Minimum HIGH time of the counter reset pulse (microseconds).
    pub counter_reset_pulse_us: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            coin_poll_interval_ms: 100, // 10 Hz
            key_settle_ms: 50,
            key_idle_scan_ms: 10,
            message_hold_ms: 1500,
            dispense_unit_ms: 100,
            counter_reset_pulse_us: 10,
        }
    }
}

/// Core machine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub language: Language,
    /// Product table, index 0 = key `A`.
    pub products: Vec<ProductDef, MAX_PRODUCTS>,
    pub timing: Timing,
}

impl MachineConfig {
    /// Default configuration for the given language: ten products with the
    /// stock names, all unavailable until the EEPROM says otherwise.
    pub fn for_language(language: Language) -> Self {
        let mut products = Vec::new();
        for name in default_product_names(language) {
            // Capacity equals the name table length.
            let _ = products.push(ProductDef {
                name: truncated_name(name),
                price: 0,
                available: false,
                unit_dispense_time: 0,
            });
        }
        Self {
            language,
            products,
            timing: Timing::default(),
        }
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::for_language(Language::English)
    }
}

/// Stock product names per language.
pub fn default_product_names(language: Language) -> [&'static str; MAX_PRODUCTS] {
    match language {
        Language::English => [
            "Lemon",
            "Grapes",
            "Orange",
            "Soda",
            "Beer",
            "Vodka",
            "Whisky",
            "Milk",
            "Water",
            "Pancho cola",
        ],
        Language::Spanish => [
            "Cloro",
            "Pinol verde",
            "Lavanda",
            "Citrico",
            "Pera manzana",
            "Mas color",
            "Ariel",
            "Flor de luna",
            "Axion",
            "Desengrasante",
        ],
    }
}

/// Copy `name` into a display-sized string, dropping whatever does not fit.
pub fn truncated_name(name: &str) -> String<PRODUCT_NAME_LEN> {
    let mut out = String::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
