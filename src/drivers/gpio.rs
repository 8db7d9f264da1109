//! `embedded-hal` pin wrappers over the raw GPIO helpers in [`super::hw_init`].
//!
//! The drivers in this crate are generic over `OutputPin` / `InputPin`;
//! these two types are what the firmware plugs in.  Pins must already be
//! configured by [`init_peripherals`](super::hw_init::init_peripherals).

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use super::hw_init::{gpio_read, gpio_write};

/// A configured push-pull output.
#[derive(Debug)]
pub struct GpioOut {
    pin: i32,
    high: bool,
}

impl GpioOut {
    /// Take ownership of output `pin`, assumed to sit at `initial` level.
    pub fn new(pin: i32, initial: bool) -> Self {
        Self { pin, high: initial }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }
}

impl ErrorType for GpioOut {
    type Error = Infallible;
}

impl OutputPin for GpioOut {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, false);
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, true);
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for GpioOut {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// A configured input.
#[derive(Debug)]
pub struct GpioIn {
    pin: i32,
}

impl GpioIn {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioIn {
    type Error = Infallible;
}

impl InputPin for GpioIn {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(gpio_read(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!gpio_read(self.pin))
    }
}
