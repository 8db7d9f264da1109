//! Selection keypad: matrix decoding and two-scan debouncing.
//!
//! The keypad is a 2 × 5 contact matrix.  A scan drives one column at a
//! time and samples the rows, rows in the outer loop and columns in the
//! inner one; the first closed contact wins.  A key only counts when two
//! scans a settle delay apart agree.

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::app::ports::{DisplayPort, KeypadMatrixPort};
use crate::credit::CreditState;
use crate::messages;

pub const ROWS: usize = 2;
pub const COLS: usize = 5;

/// Number of distinct keys (`'A'..='J'`).
pub const KEY_COUNT: u8 = 10;

/// A product selection key, `'A'..='J'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(u8);

impl Key {
    /// Key for a letter `'A'..='J'`.
    pub fn from_char(c: char) -> Option<Self> {
        let code = u32::from(c).checked_sub(u32::from('A'))?;
        u8::try_from(code)
            .ok()
            .filter(|&i| i < KEY_COUNT)
            .map(Self)
    }

    /// Zero-based product index (ordinal in the alphabet).
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn as_char(self) -> char {
        char::from(b'A' + self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Symbol wired to each (row, column) contact.
pub const KEY_TABLE: [[char; COLS]; ROWS] = [
    ['J', 'H', 'F', 'D', 'B'],
    ['I', 'G', 'E', 'C', 'A'],
];

/// Matrix position of a key, the inverse of [`KEY_TABLE`].
pub fn position_of(key: Key) -> (usize, usize) {
    let c = key.as_char();
    for (row, symbols) in KEY_TABLE.iter().enumerate() {
        if let Some(col) = symbols.iter().position(|&s| s == c) {
            return (row, col);
        }
    }
    // Every key 'A'..='J' appears in the table.
    (0, 0)
}

/// One pass over the matrix.  Returns the first closed contact, if any.
pub fn scan<M: KeypadMatrixPort + ?Sized>(matrix: &mut M) -> Option<Key> {
    for (row, symbols) in KEY_TABLE.iter().enumerate() {
        for (col, &symbol) in symbols.iter().enumerate() {
            matrix.drive_column(col);
            let closed = matrix.row_active(row);
            matrix.release_column(col);
            if closed {
                return Key::from_char(symbol);
            }
        }
    }
    None
}

/// Two-scan debouncer.
#[derive(Debug, Clone, Copy)]
pub struct KeypadDebouncer {
    settle_ms: u32,
    idle_ms: u32,
}

impl KeypadDebouncer {
    /// `settle_ms` separates the two scans of a pair; `idle_ms` is the
    /// pause after a poll that produced no key.
    pub fn new(settle_ms: u32, idle_ms: u32) -> Self {
        Self { settle_ms, idle_ms }
    }

    /// One debounce attempt: scan, settle, scan again.
    ///
    /// Returns the key only if both scans saw it.  An idle first scan
    /// returns immediately without waiting.
    pub fn poll<H>(&self, hw: &mut H) -> Option<Key>
    where
        H: KeypadMatrixPort + DelayNs + ?Sized,
    {
        let first = scan(hw)?;
        hw.delay_ms(self.settle_ms);
        let second = scan(hw);
        if second == Some(first) {
            Some(first)
        } else {
            debug!("keypad bounce: {} then {:?}", first, second.map(Key::as_char));
            None
        }
    }

    /// Block until a stable key is read.
    ///
    /// While waiting, a confirmed credit change is pushed to the credit
    /// line of the display.  This is the only place the credit readout is
    /// refreshed between prompts.  Every poll without a key is followed by
    /// the idle pause so the foreground task yields the CPU.
    pub fn wait_for_key<H>(&self, hw: &mut H, credit: &CreditState) -> Key
    where
        H: KeypadMatrixPort + DisplayPort + DelayNs + ?Sized,
    {
        loop {
            if credit.take_changed() {
                messages::show_credit(hw, credit.balance());
            }
            if let Some(key) = self.poll(hw) {
                return key;
            }
            hw.delay_ms(self.idle_ms);
        }
    }
}
