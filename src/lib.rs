//! LiquidVend firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod catalog;
pub mod coin;
pub mod config;
pub mod credit;
pub mod error;
pub mod fsm;
pub mod keypad;
pub mod messages;
pub mod storage;

mod pins;

// Hardware-facing layers; the simulation backends inside let the host
// build and tests link.
pub mod adapters;
pub mod drivers;
