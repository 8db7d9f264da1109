//! Outbound application events.
//!
//! The [`VendingMachine`](super::service::VendingMachine) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them (serial log, test recorder).

use crate::fsm::{Rejection, StateId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The machine has started (carries initial state and credit).
    Started { state: StateId, credit: u16 },

    /// The state machine moved between states.
    StateChanged { from: StateId, to: StateId },

    /// A stable key was read from the keypad.
    KeyAccepted(char),

    /// A selection was refused; no credit was taken.
    SelectionRejected {
        product: usize,
        reason: Rejection,
        credit: u16,
    },

    /// Credit was deducted for a product.
    Sale(SaleRecord),

    /// A pump line was energised.
    DispenseStarted { product: usize, duration_ms: u32 },

    /// All pump lines were released after a dispense.
    DispenseFinished { product: usize },
}

/// One completed purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleRecord {
    pub product: usize,
    pub price: u8,
    pub remaining_credit: u16,
}
