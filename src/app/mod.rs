//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules of the dispenser: the
//! selection / validation / dispense cycle and the commands and events it
//! exchanges with the outside world.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
