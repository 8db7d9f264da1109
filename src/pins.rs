//! GPIO / peripheral pin assignments for the dispenser controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// 2×5 selection keypad
// ---------------------------------------------------------------------------

/// Row inputs, internal pull-ups enabled.  LOW = contact closed on the
/// currently driven column.
pub const KEYPAD_ROW_GPIOS: [i32; 2] = [4, 5];
/// Column outputs.  Driven LOW one at a time during a scan, HIGH otherwise.
pub const KEYPAD_COL_GPIOS: [i32; 5] = [6, 7, 15, 16, 17];

// ---------------------------------------------------------------------------
// Pump relays (two cascaded 74HC595, 16 outputs, active-low relay board)
// ---------------------------------------------------------------------------

/// Serial data into the first shift register.
pub const SHIFT_SER_GPIO: i32 = 8;
/// Shift clock (rising edge shifts SER in).
pub const SHIFT_CLK_GPIO: i32 = 9;
/// Storage-register latch (rising edge copies the shift register to outputs).
pub const SHIFT_LATCH_GPIO: i32 = 10;
/// Output enable of both 595s (active-low).  Held HIGH until the register
/// holds the all-off pattern so no relay fires at power-up.
pub const RELAY_ENABLE_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Coin counter (two cascaded 7493 binary counters, 6 bits used)
// ---------------------------------------------------------------------------

/// Counter outputs, LSB first.  Counts up to 63 before wrapping.
pub const COUNTER_BIT_GPIOS: [i32; 6] = [1, 2, 3, 12, 13, 14];
/// Counter reset (HIGH pulse clears both counters).
pub const COUNTER_RESET_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Service inputs (fitted on the board, not used by the sales loop)
// ---------------------------------------------------------------------------

/// DIP mode switch, internal pull-up (LOW = on).
pub const MODE_SWITCH_GPIO: i32 = 21;
/// Arcade "special function" button, internal pull-up (LOW = pressed).
pub const SPECIAL_BUTTON_GPIO: i32 = 38;
