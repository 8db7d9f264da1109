//! Operator-facing messages for the 16×2 display.
//!
//! Every message is a two-line string; `'\n'` moves the cursor to the
//! start of the second line.  Whether a message clears the screen first and
//! whether it is held on screen are chosen per call site with
//! [`MessageOptions`].

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::app::ports::DisplayPort;
use crate::config::Language;

/// Enough for two full display lines plus the separator.
pub const MESSAGE_CAPACITY: usize = 40;

/// Catalog of fixed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId {
    Startup,
    /// Followed by the current credit.
    InsertCoins,
    NotAvailable,
    InsufficientCredit,
    /// Second line under the product name.
    Selected,
    Dispensing,
    ThankYou,
    /// Second line under the product name for a secondary selection.
    Chosen,
}

impl MessageId {
    /// Raw template for `language`.
    pub fn text(self, language: Language) -> &'static str {
        use Language::*;
        use MessageId::*;
        match (self, language) {
            (Startup, English) => "Starting\nmachine",
            (Startup, Spanish) => "Iniciando\nmaquina",
            (InsertCoins, English) => "Insert coins:\n$",
            (InsertCoins, Spanish) => "Inserte dinero:\n$",
            (NotAvailable, English) => "Product not\navailable",
            (NotAvailable, Spanish) => "Producto no\ndisponible",
            (InsufficientCredit, English) => "Insufficient\ncredit",
            (InsufficientCredit, Spanish) => "Credito\ninsuficiente",
            (Selected, English) => "\nselected",
            (Selected, Spanish) => "\nseleccionado",
            (Dispensing, English) => "Dispensing\nproduct",
            (Dispensing, Spanish) => "Llenando\nproducto",
            (ThankYou, English) => "Thanks for\nbuying",
            (ThankYou, Spanish) => "Vuelva\npronto",
            (Chosen, English) => "\nchosen",
            (Chosen, Spanish) => "\nelegido",
        }
    }

    /// Full text, with the credit filled in where the message carries one.
    pub fn render(self, language: Language, credit: u16) -> String<MESSAGE_CAPACITY> {
        let mut out = String::new();
        // Templates plus a u16 always fit.
        let _ = out.push_str(self.text(language));
        if self == MessageId::InsertCoins {
            let _ = write!(out, "{}", credit);
        }
        out
    }
}

/// Per-call display behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOptions {
    /// Blank the screen before writing.
    pub clear: bool,
    /// Keep the message up for the hold time before returning.
    pub hold: bool,
}

impl MessageOptions {
    pub const CLEAR: Self = Self { clear: true, hold: false };
    pub const CLEAR_HOLD: Self = Self { clear: true, hold: true };
    pub const HOLD: Self = Self { clear: false, hold: true };
}

/// Write `text` at the cursor.
pub fn write_text<D: DisplayPort + ?Sized>(display: &mut D, text: &str) {
    for c in text.chars() {
        if c == '\n' {
            display.set_cursor(0, 1);
        } else {
            display.put_char(c);
        }
    }
}

/// Show `text` with the given options, holding for `hold_ms` if asked.
pub fn show<H>(hw: &mut H, text: &str, options: MessageOptions, hold_ms: u32)
where
    H: DisplayPort + DelayNs + ?Sized,
{
    if options.clear {
        hw.clear();
    }
    write_text(hw, text);
    if options.hold {
        hw.delay_ms(hold_ms);
    }
}

/// Overwrite the credit readout on the second line.  Trailing blanks wipe
/// the digits of a longer previous value.
pub fn show_credit<D: DisplayPort + ?Sized>(display: &mut D, credit: u16) {
    let mut line: String<MESSAGE_CAPACITY> = String::new();
    let _ = write!(line, "${}  ", credit);
    display.set_cursor(0, 1);
    write_text(display, &line);
}
