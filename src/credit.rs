//! Shared credit balance.
//!
//! The coin sampler (timer context) adds credit, the vending state machine
//! (main task) spends it.  [`CreditState`] is the only object the two
//! contexts share, so every access is a single atomic read-modify-write:
//! an increment can never interleave with a half-finished deduction.
//!
//! ```text
//!  coin timer ──add()──▶ ┌─────────────┐ ◀──try_take()── VendingMachine
//!                        │ CreditState │
//!                        └─────────────┘ ──take_changed()──▶ credit display
//! ```

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use log::warn;

/// Returned by [`CreditState::try_take`] when the balance cannot cover the
/// requested amount.  The balance is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientCredit {
    pub balance: u16,
    pub requested: u16,
}

impl fmt::Display for InsufficientCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insufficient credit: have {}, need {}",
            self.balance, self.requested
        )
    }
}

/// Lock-free credit balance with a "changed since last display" flag.
pub struct CreditState {
    balance: AtomicU16,
    changed: AtomicBool,
}

impl CreditState {
    /// Zero balance, nothing to display.
    pub const fn new() -> Self {
        Self {
            balance: AtomicU16::new(0),
            changed: AtomicBool::new(false),
        }
    }

    /// Add `amount` and raise the changed flag.  Returns the new balance.
    ///
    /// Saturates at `u16::MAX`; the excess is dropped with a warning.
    pub fn add(&self, amount: u16) -> u16 {
        let prev = match self.balance.fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| {
            Some(b.saturating_add(amount))
        }) {
            Ok(prev) | Err(prev) => prev,
        };
        if prev.checked_add(amount).is_none() {
            warn!(
                "Credit saturated: {} + {} clipped to {}",
                prev,
                amount,
                u16::MAX
            );
        }
        self.changed.store(true, Ordering::Release);
        prev.saturating_add(amount)
    }

    /// Deduct `amount` if the balance covers it.  Returns the remaining
    /// balance, or the unchanged balance inside the error.
    pub fn try_take(&self, amount: u16) -> Result<u16, InsufficientCredit> {
        self.balance
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| b.checked_sub(amount))
            .map(|prev| prev - amount)
            .map_err(|balance| InsufficientCredit {
                balance,
                requested: amount,
            })
    }

    /// Current balance.
    pub fn balance(&self) -> u16 {
        self.balance.load(Ordering::Acquire)
    }

    /// Read and clear the changed flag.
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    /// Force the next [`take_changed`](Self::take_changed) to report `true`.
    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }
}

impl Default for CreditState {
    fn default() -> Self {
        Self::new()
    }
}
