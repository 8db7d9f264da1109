//! Coin sampling timer using ESP-IDF's esp_timer API.
//!
//! A periodic timer runs [`CoinSampler::tick`] on the board's coin
//! counter.  The sampler lives in a static behind a critical-section mutex;
//! the timer callback is its only user once the timer is running.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR).
//! Sampling can be suspended around a dispense: the timer is stopped and
//! [`tick`] refuses to run until [`resume_coin_sampling`] is called.
//!
//! On simulation targets no timer exists; tests call [`tick`] directly.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info};

use crate::coin::CoinSampler;
use crate::drivers::coin_counter::GpioCoinCounter;
use crate::drivers::gpio::{GpioIn, GpioOut};
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init::HwInitError;

/// Busy-wait delay used for the counter reset pulse inside the callback.
#[cfg(target_os = "espidf")]
pub type PulseDelay = esp_idf_svc::hal::delay::Ets;
#[cfg(not(target_os = "espidf"))]
pub type PulseDelay = crate::adapters::time::SysDelay;

#[cfg(target_os = "espidf")]
pub fn pulse_delay() -> PulseDelay {
    esp_idf_svc::hal::delay::Ets
}

#[cfg(not(target_os = "espidf"))]
pub fn pulse_delay() -> PulseDelay {
    crate::adapters::time::SysDelay::new()
}

/// The counter as wired on the board.
pub type BoardCoinCounter = GpioCoinCounter<GpioIn, GpioOut, PulseDelay>;

/// Build the counter on its board pins, reset line low.
pub fn board_coin_counter(pulse_us: u32) -> BoardCoinCounter {
    GpioCoinCounter::new(
        pins::COUNTER_BIT_GPIOS.map(GpioIn::new),
        GpioOut::new(pins::COUNTER_RESET_GPIO, false),
        pulse_delay(),
        pulse_us,
    )
}

type SamplerCell = RefCell<Option<CoinSampler<BoardCoinCounter>>>;

static SAMPLER: Mutex<CriticalSectionRawMutex, SamplerCell> = Mutex::new(RefCell::new(None));
static SAMPLING: AtomicBool = AtomicBool::new(false);

/// Hand the sampler to the timer context.  Replaces any previous one.
pub fn install_sampler(sampler: CoinSampler<BoardCoinCounter>) {
    SAMPLER.lock(|cell| *cell.borrow_mut() = Some(sampler));
}

/// Run `f` on the installed sampler, if any.
pub fn with_sampler<R>(f: impl FnOnce(&mut CoinSampler<BoardCoinCounter>) -> R) -> Option<R> {
    SAMPLER.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

/// One coin tick.  Returns the credited amount, if any.
pub fn tick() -> Option<u8> {
    if !SAMPLING.load(Ordering::Acquire) {
        return None;
    }
    with_sampler(CoinSampler::tick).flatten()
}

pub fn is_sampling() -> bool {
    SAMPLING.load(Ordering::Acquire)
}

#[cfg(target_os = "espidf")]
static mut COIN_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut COIN_PERIOD_US: u64 = 100_000;

/// SAFETY: COIN_TIMER is written once in `start_coin_timer()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn coin_timer() -> esp_timer_handle_t { unsafe { COIN_TIMER } }

#[cfg(target_os = "espidf")]
unsafe extern "C" fn coin_tick_cb(_arg: *mut core::ffi::c_void) {
    tick();
}

/// Create and start the periodic coin timer.
#[cfg(target_os = "espidf")]
pub fn start_coin_timer(period_ms: u32) -> Result<(), HwInitError> {
    // SAFETY: COIN_TIMER and COIN_PERIOD_US are written here once at boot
    // from the main task before the callback can fire.
    unsafe {
        COIN_PERIOD_US = u64::from(period_ms) * 1_000;
        let args = esp_timer_create_args_t {
            callback: Some(coin_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"coin".as_ptr(),
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut COIN_TIMER);
        if ret != ESP_OK {
            return Err(HwInitError::TimerCreateFailed(ret));
        }
        SAMPLING.store(true, Ordering::Release);
        let ret = esp_timer_start_periodic(coin_timer(), COIN_PERIOD_US);
        if ret != ESP_OK {
            SAMPLING.store(false, Ordering::Release);
            return Err(HwInitError::TimerStartFailed(ret));
        }
    }
    info!("hw_timer: coin sampling every {} ms", period_ms);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_coin_timer(period_ms: u32) -> Result<(), super::hw_init::HwInitError> {
    SAMPLING.store(true, Ordering::Release);
    info!("hw_timer(sim): coin timer not started ({} ms period, call tick())", period_ms);
    Ok(())
}

/// Stop sampling.  Coins inserted meanwhile stay in the counter.
pub fn suspend_coin_sampling() {
    if SAMPLING.swap(false, Ordering::AcqRel) {
        stop_hw_timer();
        debug!("hw_timer: coin sampling suspended");
    }
}

/// Restart sampling after [`suspend_coin_sampling`].
pub fn resume_coin_sampling() {
    if !SAMPLING.swap(true, Ordering::AcqRel) {
        restart_hw_timer();
        debug!("hw_timer: coin sampling resumed");
    }
}

#[cfg(target_os = "espidf")]
fn stop_hw_timer() {
    // SAFETY: coin_timer() contract; stopping a stopped timer only
    // returns an error code.
    unsafe {
        let t = coin_timer();
        if !t.is_null() { esp_timer_stop(t); }
    }
}

#[cfg(target_os = "espidf")]
fn restart_hw_timer() {
    // SAFETY: coin_timer() contract; COIN_PERIOD_US is immutable after boot.
    unsafe {
        let t = coin_timer();
        if !t.is_null() { esp_timer_start_periodic(t, COIN_PERIOD_US); }
    }
}

#[cfg(not(target_os = "espidf"))]
fn stop_hw_timer() {}

#[cfg(not(target_os = "espidf"))]
fn restart_hw_timer() {}
