//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ VendingMachine / CoinSampler (domain)
//! ```
//!
//! Driven adapters (keypad matrix, coin counter, relay bank, display,
//! EEPROM image) implement these traits.  The domain core consumes them via
//! generics, so it never touches hardware directly and every loop can run
//! against mocks on the host.
//!
//! All waits go through [`embedded_hal::delay::DelayNs`], which the
//! hardware adapter implements alongside the traits below.

use embedded_hal::delay::DelayNs;

use crate::app::commands::PumpSelect;
use crate::config::MachineConfig;

// ───────────────────────────────────────────────────────────────
// Coin counter port (timer context)
// ───────────────────────────────────────────────────────────────

/// Access to the external binary coin counter.
pub trait CoinCounterPort {
    /// Current counter value.  Only the low 6 bits are meaningful.
    fn read_raw(&mut self) -> u8;

    /// Pulse the counter reset line (HIGH for at least the minimum pulse
    /// width, then LOW).
    fn pulse_reset(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Keypad matrix port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Electrical access to the selection keypad matrix.
pub trait KeypadMatrixPort {
    /// Drive column `col` to its active level.
    fn drive_column(&mut self, col: usize);

    /// Return column `col` to its idle (released) level.
    fn release_column(&mut self, col: usize);

    /// `true` if row `row` sees the driven column through a closed contact.
    fn row_active(&mut self, row: usize) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Pump relay bank.  Open loop: no status comes back.
pub trait PumpPort {
    fn set_pump(&mut self, select: PumpSelect);
}

/// Character display, two lines.
pub trait DisplayPort {
    /// Blank the screen and home the cursor.
    fn clear(&mut self);

    /// Move the cursor to `col` (0-based) on line `row` (0-based).
    fn set_cursor(&mut self, col: u8, row: u8);

    /// Write one character at the cursor and advance it.
    fn put_char(&mut self, c: char);
}

/// Start/stop control of the periodic coin sampling tick.
pub trait CoinSamplingPort {
    /// Stop sampling the coin counter (coins are held in the counter).
    fn suspend_coin_sampling(&mut self);

    /// Restart periodic sampling.
    fn resume_coin_sampling(&mut self);
}

/// Everything the vending state machine drives, bundled so the service
/// takes a single `&mut hw` like the control loop does.
pub trait MachinePorts:
    KeypadMatrixPort + PumpPort + DisplayPort + CoinSamplingPort + DelayNs
{
}

impl<T> MachinePorts for T where
    T: KeypadMatrixPort + PumpPort + DisplayPort + CoinSamplingPort + DelayNs
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the machine configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`MachineConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<MachineConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &MachineConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Byte storage port (driven adapter: domain ↔ EEPROM image)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed non-volatile storage, the shape of a small EEPROM.
pub trait ByteStoragePort {
    /// Read one byte.
    fn read_byte(&self, addr: u16) -> Result<u8, StorageError>;

    /// Write one byte durably.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`ByteStoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Address beyond the end of the storage image.
    OutOfRange(u16),
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfRange(addr) => write!(f, "address 0x{:02X} out of range", addr),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
