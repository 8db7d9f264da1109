//! Pump relay bank behind two cascaded 74HC595 shift registers.
//!
//! 16 outputs, each driving one active-low relay.  A pattern is shifted in
//! most-significant first (output 16 down to output 1), one clock per bit,
//! then latched so all outputs switch together.  The relay board never sees
//! a half-shifted pattern.
//!
//! ```text
//!  SER ──▶ [595 #1: Q1..Q8] ──▶ [595 #2: Q9..Q16]
//!  CLK ──┘        LATCH ──┘ both        /OE ──┘ both (relay enable)
//! ```
//!
//! ## Boot contract
//!
//! [`init`](ShiftRegisterPumps::init) loads the all-off pattern before it
//! asserts output-enable, so no relay chatters at power-up.

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::app::commands::{PUMP_OUTPUTS, PumpSelect};
use crate::app::ports::PumpPort;

/// Output levels for a selection: bit `n - 1` is output `n`, 1 = HIGH
/// (relay released).  At most one bit is low.
pub fn output_levels(select: PumpSelect) -> u16 {
    match select.line() {
        Some(n) => !(1u16 << (n - 1)),
        None => u16::MAX,
    }
}

pub struct ShiftRegisterPumps<SER, CLK, LATCH, OE> {
    ser: SER,
    clk: CLK,
    latch: LATCH,
    output_enable: OE,
    active: PumpSelect,
    enabled: bool,
    pin_errors: u32,
}

impl<SER, CLK, LATCH, OE> ShiftRegisterPumps<SER, CLK, LATCH, OE>
where
    SER: OutputPin,
    CLK: OutputPin,
    LATCH: OutputPin,
    OE: OutputPin,
{
    /// Wrap the four control pins.  Nothing is driven until [`init`](Self::init).
    pub fn new(ser: SER, clk: CLK, latch: LATCH, output_enable: OE) -> Self {
        Self {
            ser,
            clk,
            latch,
            output_enable,
            active: PumpSelect::Off,
            enabled: false,
            pin_errors: 0,
        }
    }

    /// Clear the register, then enable the relay outputs.
    pub fn init(&mut self) {
        let mut ok = drive(&mut self.output_enable, true);
        ok &= drive(&mut self.clk, false);
        ok &= drive(&mut self.latch, false);
        if !ok {
            self.pin_errors += 1;
        }
        self.write(PumpSelect::Off);
        if drive(&mut self.output_enable, false) {
            self.enabled = true;
            info!("Pump relays enabled (all off)");
        } else {
            self.pin_errors += 1;
            warn!("Pump relay enable failed");
        }
    }

    /// Raw 1-based target.  Anything outside `1..=16` switches everything off.
    pub fn activate(&mut self, target: u8) {
        self.write(PumpSelect::from_target(target));
    }

    /// Currently latched selection.
    pub fn active(&self) -> PumpSelect {
        self.active
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of pattern writes that hit a pin error.
    pub fn pin_errors(&self) -> u32 {
        self.pin_errors
    }

    fn write(&mut self, select: PumpSelect) {
        let levels = output_levels(select);
        let mut ok = true;

        for bit in (0..PUMP_OUTPUTS).rev() {
            ok &= drive(&mut self.ser, levels & (1 << bit) != 0);
            ok &= drive(&mut self.clk, false);
            ok &= drive(&mut self.clk, true);
        }
        ok &= drive(&mut self.latch, false);
        ok &= drive(&mut self.latch, true);

        if ok {
            debug!("pumps: latched {:016b}", levels);
        } else {
            self.pin_errors += 1;
            warn!("pumps: pin error while writing {:?}", select);
        }
        self.active = select;
    }
}

impl<SER, CLK, LATCH, OE> PumpPort for ShiftRegisterPumps<SER, CLK, LATCH, OE>
where
    SER: OutputPin,
    CLK: OutputPin,
    LATCH: OutputPin,
    OE: OutputPin,
{
    fn set_pump(&mut self, select: PumpSelect) {
        self.write(select);
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) -> bool {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.is_ok()
}
