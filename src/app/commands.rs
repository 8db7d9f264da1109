//! Outbound actuator commands.
//!
//! [`PumpSelect`] is what the application core hands to the
//! [`PumpPort`](super::ports::PumpPort).  Out-of-range targets are not an
//! error: they collapse to [`PumpSelect::Off`], so "select nothing" and
//! "stop everything" are the same command.

use core::num::NonZeroU8;

use log::debug;

/// Number of relay outputs behind the two cascaded shift registers.
pub const PUMP_OUTPUTS: u8 = 16;

/// Legacy raw target meaning "disable all pumps" (one past the last output).
pub const DISABLE_ALL_TARGET: u8 = PUMP_OUTPUTS + 1;

/// Which pump line (if any) should be energised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpSelect {
    /// Every line inactive.
    Off,
    /// Exactly this line active (1-based, 1..=[`PUMP_OUTPUTS`]).
    Line(NonZeroU8),
}

impl PumpSelect {
    /// Map a raw 1-based target to a command.  Anything outside
    /// `1..=PUMP_OUTPUTS` (including [`DISABLE_ALL_TARGET`]) is `Off`.
    pub fn from_target(target: u8) -> Self {
        match NonZeroU8::new(target) {
            Some(line) if target <= PUMP_OUTPUTS => Self::Line(line),
            _ => {
                if target != DISABLE_ALL_TARGET {
                    debug!("pump target {} out of range, treating as all-off", target);
                }
                Self::Off
            }
        }
    }

    /// Line for a zero-based product index.
    pub fn for_product(index: usize) -> Self {
        u8::try_from(index + 1).map_or(Self::Off, Self::from_target)
    }

    /// The active line, if any.
    pub fn line(self) -> Option<u8> {
        match self {
            Self::Off => None,
            Self::Line(n) => Some(n.get()),
        }
    }
}
