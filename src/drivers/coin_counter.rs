//! External 6-bit coin counter.
//!
//! The coin mech pulses the clock input of a binary ripple counter; the six
//! low outputs are wired to GPIO inputs, LSB first.  A HIGH pulse on the
//! reset line clears it.  Read and reset both run in the coin timer
//! callback, so the pulse uses a busy-wait delay.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::CoinCounterPort;

pub const COUNTER_BITS: usize = 6;

pub struct GpioCoinCounter<B, R, D> {
    bits: [B; COUNTER_BITS],
    reset: R,
    delay: D,
    pulse_us: u32,
}

impl<B, R, D> GpioCoinCounter<B, R, D>
where
    B: InputPin,
    R: OutputPin,
    D: DelayNs,
{
    /// `pulse_us` is the minimum HIGH time of the reset pulse.
    pub fn new(bits: [B; COUNTER_BITS], reset: R, delay: D, pulse_us: u32) -> Self {
        Self {
            bits,
            reset,
            delay,
            pulse_us,
        }
    }
}

impl<B, R, D> CoinCounterPort for GpioCoinCounter<B, R, D>
where
    B: InputPin,
    R: OutputPin,
    D: DelayNs,
{
    fn read_raw(&mut self) -> u8 {
        let mut value = 0u8;
        for (i, pin) in self.bits.iter_mut().enumerate() {
            // A pin that cannot be read counts as 0.
            if pin.is_high().unwrap_or(false) {
                value |= 1 << i;
            }
        }
        value
    }

    fn pulse_reset(&mut self) {
        let raised = self.reset.set_high().is_ok();
        self.delay.delay_us(self.pulse_us);
        if !raised || self.reset.set_low().is_err() {
            warn!("coin counter: reset pulse failed");
        }
    }
}
