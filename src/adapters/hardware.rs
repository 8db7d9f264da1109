//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the keypad matrix, the pump relay bank, the display and the main
//! task's delay, exposing them through the [`MachinePorts`] bundle the
//! vending state machine runs on.  Coin sampling control forwards to the
//! coin timer in [`crate::drivers::hw_timer`].  Every delay on the
//! foreground task feeds the task watchdog, if one is attached.  On non-espidf targets the
//! underlying pins are the simulated ones from `hw_init`.
//!
//! [`MachinePorts`]: crate::app::ports::MachinePorts

use embedded_hal::delay::DelayNs;

use crate::adapters::display::LogDisplay;
use crate::adapters::time::SysDelay;
use crate::app::commands::PumpSelect;
use crate::app::ports::{CoinSamplingPort, DisplayPort, KeypadMatrixPort, PumpPort};
use crate::drivers::gpio::{GpioIn, GpioOut};
use crate::drivers::hw_init::OUTPUT_PINS;
use crate::drivers::hw_timer;
use crate::drivers::keypad_matrix::GpioKeypadMatrix;
use crate::drivers::shift_register::ShiftRegisterPumps;
use crate::drivers::watchdog::Watchdog;
use crate::pins;

/// The relay bank as wired on the board.
pub type BoardPumps = ShiftRegisterPumps<GpioOut, GpioOut, GpioOut, GpioOut>;

/// The keypad as wired on the board.
pub type BoardKeypad = GpioKeypadMatrix<GpioIn, GpioOut>;

/// Output pin at its boot level from [`OUTPUT_PINS`].
fn board_out(pin: i32) -> GpioOut {
    let level = OUTPUT_PINS
        .iter()
        .find(|&&(p, _)| p == pin)
        .is_none_or(|&(_, high)| high);
    GpioOut::new(pin, level)
}

/// Build the relay bank on its board pins (not yet initialised).
pub fn board_pumps() -> BoardPumps {
    ShiftRegisterPumps::new(
        board_out(pins::SHIFT_SER_GPIO),
        board_out(pins::SHIFT_CLK_GPIO),
        board_out(pins::SHIFT_LATCH_GPIO),
        board_out(pins::RELAY_ENABLE_GPIO),
    )
}

/// Build the keypad matrix on its board pins.
pub fn board_keypad() -> BoardKeypad {
    GpioKeypadMatrix::new(
        pins::KEYPAD_ROW_GPIOS.map(GpioIn::new),
        pins::KEYPAD_COL_GPIOS.map(board_out),
    )
}

/// Concrete adapter that combines all foreground hardware behind port traits.
pub struct HardwareAdapter<K = BoardKeypad, P = BoardPumps> {
    keypad: K,
    pumps: P,
    display: LogDisplay,
    delay: SysDelay,
    watchdog: Option<Watchdog>,
}

impl HardwareAdapter {
    /// Adapter on the board pins.  The relay bank must already be
    /// initialised (all off, outputs enabled).
    pub fn board(pumps: BoardPumps) -> Self {
        Self::new(board_keypad(), pumps, LogDisplay::new(), SysDelay::new())
    }
}

impl<K, P> HardwareAdapter<K, P> {
    pub fn new(keypad: K, pumps: P, display: LogDisplay, delay: SysDelay) -> Self {
        Self {
            keypad,
            pumps,
            display,
            delay,
            watchdog: None,
        }
    }

    /// Feed `watchdog` from every delay from now on.
    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    pub fn watchdog(&self) -> Option<&Watchdog> {
        self.watchdog.as_ref()
    }

    pub fn display(&self) -> &LogDisplay {
        &self.display
    }

    pub fn pumps(&self) -> &P {
        &self.pumps
    }
}

// ── KeypadMatrixPort implementation ───────────────────────────

impl<K: KeypadMatrixPort, P> KeypadMatrixPort for HardwareAdapter<K, P> {
    fn drive_column(&mut self, col: usize) {
        if col == 0 {
            // Start of a scan: whatever is on screen has settled.
            self.display.flush();
        }
        self.keypad.drive_column(col);
    }

    fn release_column(&mut self, col: usize) {
        self.keypad.release_column(col);
    }

    fn row_active(&mut self, row: usize) -> bool {
        self.keypad.row_active(row)
    }
}

// ── PumpPort implementation ───────────────────────────────────

impl<K, P: PumpPort> PumpPort for HardwareAdapter<K, P> {
    fn set_pump(&mut self, select: PumpSelect) {
        self.pumps.set_pump(select);
    }
}

// ── DisplayPort implementation ────────────────────────────────

impl<K, P> DisplayPort for HardwareAdapter<K, P> {
    fn clear(&mut self) {
        self.display.clear();
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.display.set_cursor(col, row);
    }

    fn put_char(&mut self, c: char) {
        self.display.put_char(c);
    }
}

// ── CoinSamplingPort implementation ───────────────────────────

impl<K, P> CoinSamplingPort for HardwareAdapter<K, P> {
    fn suspend_coin_sampling(&mut self) {
        hw_timer::suspend_coin_sampling();
    }

    fn resume_coin_sampling(&mut self) {
        hw_timer::resume_coin_sampling();
    }
}

// ── Delay ─────────────────────────────────────────────────────

impl<K, P> DelayNs for HardwareAdapter<K, P> {
    fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.display.flush();
        let Some(watchdog) = &self.watchdog else {
            self.delay.delay_ms(ms);
            return;
        };
        // A dispense can outlast the watchdog timeout.
        let slice = watchdog.feed_interval_ms();
        let mut left = ms;
        loop {
            watchdog.feed();
            let now = left.min(slice);
            self.delay.delay_ms(now);
            left -= now;
            if left == 0 {
                break;
            }
        }
    }
}
