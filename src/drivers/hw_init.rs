//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and idle levels for the keypad matrix, coin
//! counter, shift-register chain and relay enable using raw ESP-IDF sys
//! calls.  Called once from `main()` before the coin timer starts.
//!
//! On the host the pins are simulated by a 64-bit level map so the GPIO
//! wrappers in [`super::gpio`] behave like wires in tests.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    TimerCreateFailed(i32),
    TimerStartFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::TimerCreateFailed(rc) => write!(f, "timer create failed (rc={})", rc),
            Self::TimerStartFailed(rc) => write!(f, "timer start failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(_) => Self::Init("GPIO config failed"),
            HwInitError::TimerCreateFailed(_) => Self::Init("coin timer create failed"),
            HwInitError::TimerStartFailed(_) => Self::Init("coin timer start failed"),
        }
    }
}

/// Pins read by the firmware.  Keypad rows and the two operator inputs idle
/// high through pull-ups; the counter outputs are push-pull.
pub const INPUT_PINS_PULLED_UP: [i32; pins::KEYPAD_ROW_GPIOS.len() + 2] = [
    pins::KEYPAD_ROW_GPIOS[0],
    pins::KEYPAD_ROW_GPIOS[1],
    pins::MODE_SWITCH_GPIO,
    pins::SPECIAL_BUTTON_GPIO,
];

/// Output pins with their boot level.  Keypad columns idle high, the relay
/// enable (74HC595 /OE) starts high so no relay moves before the register
/// has been cleared.
pub const OUTPUT_PINS: [(i32, bool); 10] = [
    (pins::KEYPAD_COL_GPIOS[0], true),
    (pins::KEYPAD_COL_GPIOS[1], true),
    (pins::KEYPAD_COL_GPIOS[2], true),
    (pins::KEYPAD_COL_GPIOS[3], true),
    (pins::KEYPAD_COL_GPIOS[4], true),
    (pins::SHIFT_SER_GPIO, true),
    (pins::SHIFT_CLK_GPIO, false),
    (pins::SHIFT_LATCH_GPIO, false),
    (pins::RELAY_ENABLE_GPIO, true),
    (pins::COUNTER_RESET_GPIO, false),
];

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the coin timer; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    for &(pin, level) in &OUTPUT_PINS {
        gpio_write(pin, level);
    }
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    for &pin in &INPUT_PINS_PULLED_UP {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    for &pin in &pins::COUNTER_BIT_GPIOS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe from task and timer context.
    (unsafe { gpio_get_level(pin) }) != 0
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &(pin, level) in &OUTPUT_PINS {
        // Latch the idle level before the pin becomes an output.
        unsafe { gpio_set_level(pin, u32::from(level)) };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    // Each output has exactly one owner (main task or coin timer).
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU64, Ordering};

    use super::INPUT_PINS_PULLED_UP;

    const fn idle_levels() -> u64 {
        let mut bits = 0u64;
        let mut i = 0;
        while i < INPUT_PINS_PULLED_UP.len() {
            bits |= 1u64 << INPUT_PINS_PULLED_UP[i];
            i += 1;
        }
        bits
    }

    static LEVELS: AtomicU64 = AtomicU64::new(idle_levels());

    pub fn read(pin: i32) -> bool {
        LEVELS.load(Ordering::Acquire) & (1u64 << pin) != 0
    }

    pub fn write(pin: i32, high: bool) {
        if high {
            LEVELS.fetch_or(1u64 << pin, Ordering::AcqRel);
        } else {
            LEVELS.fetch_and(!(1u64 << pin), Ordering::AcqRel);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::read(pin)
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim::write(pin, high);
}
