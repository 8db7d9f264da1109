//! LiquidVend Firmware — Main Entry Point
//!
//! Hexagonal architecture: one foreground task runs the vending cycle, a
//! periodic timer samples the coin counter.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter          LogEventSink   NvsAdapter            │
//! │  (Keypad+Pumps+Display)   (EventSink)    (Config+ByteStorage)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            VendingMachine (pure logic)                 │    │
//! │  │  Selection · Validation · Dispense                     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                          ▲                                     │
//! │                     CreditState                                │
//! │                          ▲                                     │
//! │  esp_timer ──▶ CoinSampler (counter debounce, every 100 ms)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod catalog;
mod coin;
mod credit;
mod error;
mod keypad;
mod messages;
mod pins;
mod storage;

pub mod app;
mod adapters;
mod drivers;
pub mod fsm;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use adapters::hardware::{HardwareAdapter, board_pumps};
use adapters::log_sink::LogEventSink;
use adapters::nvs::NvsAdapter;
use adapters::time::SysDelay;
use app::ports::ConfigPort;
use app::service::VendingMachine;
use catalog::Catalog;
use coin::CoinSampler;
use config::MachineConfig;
use credit::CreditState;
use drivers::hw_init;
use drivers::hw_timer;
use drivers::watchdog::Watchdog;
use storage::ProductStore;

/// Shared between the coin timer callback and the vending cycle.
static CREDIT: CreditState = CreditState::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  LiquidVend v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    let watchdog = Watchdog::default();
    if let Err(e) = hw_init::init_peripherals() {
        // Relay state is unknown without GPIO.  Stop feeding and let the
        // watchdog reset the board.
        log::error!("HAL init failed: {}, halting", e);
        let mut idle = SysDelay::new();
        loop {
            idle.delay_ms(1000);
        }
    }

    // Relay bank to all-off before its outputs are enabled.
    let mut pumps = board_pumps();
    pumps.init();

    // ── 3. Load config and product image ──────────────────────
    let (config, catalog) = match NvsAdapter::new() {
        Ok(nvs) => {
            let config = match nvs.load() {
                Ok(cfg) => {
                    info!("Config loaded from NVS");
                    cfg
                }
                Err(e) => {
                    warn!("NVS config load failed ({}), using defaults", e);
                    MachineConfig::default()
                }
            };
            let catalog = ProductStore::load_or_disabled(&nvs, &config);
            log_sales(&nvs, &catalog);
            (config, catalog)
        }
        Err(e) => {
            warn!("NVS init failed ({}), no product can be sold", e);
            let config = MachineConfig::default();
            let catalog = Catalog::all_unavailable(&config);
            (config, catalog)
        }
    };
    match serde_json::to_string(&config) {
        Ok(json) => info!("Config: {}", json),
        Err(e) => warn!("Config not printable: {}", e),
    }
    info!(
        "Catalog: {} products, {} available",
        catalog.len(),
        catalog.available_count()
    );

    // Service inputs are wired but play no part in the sales loop.
    info!(
        "Mode switch {}, special button {}",
        if hw_init::gpio_read(pins::MODE_SWITCH_GPIO) { "off" } else { "on" },
        if hw_init::gpio_read(pins::SPECIAL_BUTTON_GPIO) { "released" } else { "pressed" },
    );

    // ── 4. Coin counter + sampling timer ──────────────────────
    let counter = hw_timer::board_coin_counter(config.timing.counter_reset_pulse_us);
    let mut sampler = CoinSampler::new(counter, &CREDIT);
    sampler.reset_counter();
    hw_timer::install_sampler(sampler);
    hw_timer::start_coin_timer(config.timing.coin_poll_interval_ms).map_err(error::Error::from)?;

    // ── 5. Vending cycle ──────────────────────────────────────
    let mut hw = HardwareAdapter::board(pumps).with_watchdog(watchdog);
    let mut sink = LogEventSink::new();
    let mut machine = VendingMachine::new(&config, catalog, &CREDIT);
    machine.start(&mut hw, &mut sink);

    info!("Entering vending loop");
    machine.run_forever(&mut hw, &mut sink)
}

/// Log the per-product and total sales counters kept in the image.
fn log_sales(nvs: &NvsAdapter, catalog: &Catalog) {
    for (i, product) in catalog.iter().enumerate() {
        info!("  {:<2} {:<16} sold {}", i + 1, product.name.as_str(), product.sales_count);
    }
    match ProductStore::read_total_sales(nvs) {
        Ok(total) => info!("Total sales: {}", total),
        Err(e) => warn!("Total sales unreadable: {}", e),
    }
}
