//! States of the selection / dispense cycle.
//!
//! ```text
//!                ┌──────────────────────────────────────────────┐
//!                ▼                                              │
//!   AWAITING ──[stable key]──▶ VALIDATING ──[ok]──▶ ACCEPTED     │
//!      ▲                          │                    │        │
//!      │                  [unavailable / short]        ▼        │
//!      └──────────────────── REJECTED             DISPENSING    │
//!                                                      │        │
//!                                                      ▼        │
//!                                                  COOLDOWN ────┘
//! ```
//!
//! There is no terminal state.  The handlers live on
//! [`VendingMachine`](crate::app::service::VendingMachine); this module
//! owns the state identities and the legal edges between them.

use core::fmt;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    AwaitingSelection = 0,
    Validating = 1,
    Rejected = 2,
    Accepted = 3,
    Dispensing = 4,
    Cooldown = 5,
}

impl StateId {
    /// Total number of states.
    pub const COUNT: usize = 6;

    /// Short display name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::AwaitingSelection => "AwaitingSelection",
            Self::Validating => "Validating",
            Self::Rejected => "Rejected",
            Self::Accepted => "Accepted",
            Self::Dispensing => "Dispensing",
            Self::Cooldown => "Cooldown",
        }
    }

    /// Whether `self → next` is an edge of the cycle.
    ///
    /// `AwaitingSelection → AwaitingSelection` and
    /// `Validating → AwaitingSelection` are allowed: a key outside the
    /// configured catalog is simply dropped.
    pub fn can_transition_to(self, next: StateId) -> bool {
        use StateId::*;
        matches!(
            (self, next),
            (AwaitingSelection, AwaitingSelection | Validating)
                | (Validating, Rejected | Accepted | AwaitingSelection)
                | (Rejected, AwaitingSelection)
                | (Accepted, Dispensing | Rejected)
                | (Dispensing, Cooldown)
                | (Cooldown, AwaitingSelection)
        )
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Rejection reasons
// ---------------------------------------------------------------------------

/// Why a selection did not proceed to dispensing.  Checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The product's availability flag is off.
    NotAvailable,
    /// The product costs more than the current credit.
    InsufficientCredit,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => write!(f, "product not available"),
            Self::InsufficientCredit => write!(f, "insufficient credit"),
        }
    }
}
