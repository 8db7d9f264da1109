//! Coin acceptor debouncing.
//!
//! The coin mechanism feeds an external 6-bit binary counter.  The counter
//! output is noisy while it ripples, so a value is only trusted when the
//! same nonzero reading shows up on two consecutive ticks.  Once trusted,
//! it is credited and the counter is reset.
//!
//! ```text
//!  tick:   read  ─┬─ 0 ───────────────▶ clear pending
//!                 ├─ == pending ──────▶ credit += v, reset counter, clear pending
//!                 └─ != pending ──────▶ pending = v
//! ```

use log::{debug, info};

use crate::app::ports::CoinCounterPort;
use crate::credit::CreditState;

/// Only the low six counter bits are wired.
pub const COUNTER_MASK: u8 = 0x3F;

/// Two-tick agreement filter for the coin counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoinDebouncer {
    pending: u8,
}

impl CoinDebouncer {
    pub const fn new() -> Self {
        Self { pending: 0 }
    }

    /// Value seen on the previous tick (0 = none).
    pub fn pending(&self) -> u8 {
        self.pending
    }

    /// Process one sample.  Returns the credited amount when a value is
    /// accepted.
    pub fn tick<C>(&mut self, counter: &mut C, credit: &CreditState) -> Option<u8>
    where
        C: CoinCounterPort + ?Sized,
    {
        let raw = counter.read_raw() & COUNTER_MASK;

        if raw == 0 {
            self.pending = 0;
            return None;
        }

        if raw == self.pending {
            let balance = credit.add(u16::from(raw));
            counter.pulse_reset();
            self.pending = 0;
            info!("Coins accepted: +{} (credit {})", raw, balance);
            return Some(raw);
        }

        debug!("coin counter: {} (pending {})", raw, self.pending);
        self.pending = raw;
        None
    }
}

/// Everything the periodic coin tick owns: the counter, its debouncer and a
/// handle on the shared credit.
pub struct CoinSampler<C> {
    counter: C,
    debouncer: CoinDebouncer,
    credit: &'static CreditState,
}

impl<C: CoinCounterPort> CoinSampler<C> {
    pub fn new(counter: C, credit: &'static CreditState) -> Self {
        Self {
            counter,
            debouncer: CoinDebouncer::new(),
            credit,
        }
    }

    /// Body of the timer callback.
    pub fn tick(&mut self) -> Option<u8> {
        self.debouncer.tick(&mut self.counter, self.credit)
    }

    /// Discard anything counted while the machine was off.
    pub fn reset_counter(&mut self) {
        self.counter.pulse_reset();
        self.debouncer = CoinDebouncer::new();
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }
}
