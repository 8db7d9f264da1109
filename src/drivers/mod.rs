//! Pin-level drivers, hardware initialisation, and the coin timer.

pub mod coin_counter;
pub mod gpio;
pub mod hw_init;
pub mod hw_timer;
pub mod keypad_matrix;
pub mod shift_register;
pub mod watchdog;
