//! GPIO keypad matrix.
//!
//! Columns are outputs idling HIGH; a scan pulls one LOW at a time.  Rows
//! are pulled-up inputs, so a closed contact on the driven column reads
//! LOW.  Decoding and debouncing live in [`crate::keypad`].

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::KeypadMatrixPort;
use crate::keypad::{COLS, ROWS};

pub struct GpioKeypadMatrix<R, C> {
    rows: [R; ROWS],
    cols: [C; COLS],
}

impl<R: InputPin, C: OutputPin> GpioKeypadMatrix<R, C> {
    pub fn new(rows: [R; ROWS], cols: [C; COLS]) -> Self {
        Self { rows, cols }
    }
}

impl<R: InputPin, C: OutputPin> KeypadMatrixPort for GpioKeypadMatrix<R, C> {
    fn drive_column(&mut self, col: usize) {
        if let Some(pin) = self.cols.get_mut(col) {
            if pin.set_low().is_err() {
                warn!("keypad: column {} drive failed", col);
            }
        }
    }

    fn release_column(&mut self, col: usize) {
        if let Some(pin) = self.cols.get_mut(col) {
            if pin.set_high().is_err() {
                warn!("keypad: column {} release failed", col);
            }
        }
    }

    fn row_active(&mut self, row: usize) -> bool {
        self.rows
            .get_mut(row)
            .is_some_and(|pin| pin.is_low().unwrap_or(false))
    }
}
