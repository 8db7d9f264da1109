//! Delay and uptime adapter.
//!
//! Every wait in the firmware goes through [`embedded_hal::delay::DelayNs`].
//!
//! - **`target_os = "espidf"`** — millisecond waits yield to FreeRTOS
//!   (the coin timer task keeps running), sub-millisecond waits busy-wait
//!   on the ROM `ets_delay_us`.
//! - **`not(target_os = "espidf")`** — `std::thread::sleep` for host-side
//!   simulation.

use embedded_hal::delay::DelayNs;

/// Blocking delay for the main task.
#[derive(Debug, Clone, Copy)]
pub struct SysDelay {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SysDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl SysDelay {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since this adapter was created (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(target_os = "espidf")]
impl DelayNs for SysDelay {
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_svc::hal::delay::Ets::delay_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        esp_idf_svc::hal::delay::Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for SysDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
