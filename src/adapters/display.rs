//! 16×2 character screen mirrored to the log.
//!
//! Keeps an in-memory copy of what the character LCD shows and logs the
//! whole screen whenever it settles (before a clear, a wait, or a keypad
//! scan).  The panel protocol itself is not driven from here.

use heapless::String;
use log::info;

use crate::app::ports::DisplayPort;

pub const DISPLAY_COLS: usize = 16;
pub const DISPLAY_ROWS: usize = 2;

/// Room for one line of multi-byte characters.
const LINE_CAPACITY: usize = DISPLAY_COLS * 4;

#[derive(Debug, Clone)]
pub struct LogDisplay {
    cells: [[char; DISPLAY_COLS]; DISPLAY_ROWS],
    col: usize,
    row: usize,
    dirty: bool,
}

impl Default for LogDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDisplay {
    pub fn new() -> Self {
        Self {
            cells: [[' '; DISPLAY_COLS]; DISPLAY_ROWS],
            col: 0,
            row: 0,
            dirty: false,
        }
    }

    /// Text of one line with trailing blanks removed.
    pub fn line(&self, row: usize) -> String<LINE_CAPACITY> {
        let mut out = String::new();
        if let Some(cells) = self.cells.get(row) {
            for &c in cells {
                let _ = out.push(c);
            }
        }
        while out.ends_with(' ') {
            out.pop();
        }
        out
    }

    /// Log the screen if it changed since the last flush.
    pub fn flush(&mut self) {
        if self.dirty {
            info!("LCD   | {:<16} | {:<16}", self.line(0).as_str(), self.line(1).as_str());
            self.dirty = false;
        }
    }
}

impl DisplayPort for LogDisplay {
    fn clear(&mut self) {
        self.flush();
        self.cells = [[' '; DISPLAY_COLS]; DISPLAY_ROWS];
        self.col = 0;
        self.row = 0;
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.col = usize::from(col).min(DISPLAY_COLS);
        self.row = usize::from(row).min(DISPLAY_ROWS - 1);
    }

    fn put_char(&mut self, c: char) {
        // Characters past the right edge are dropped, as on the panel.
        if self.col < DISPLAY_COLS {
            self.cells[self.row][self.col] = c;
            self.col += 1;
            self.dirty = true;
        }
    }
}
