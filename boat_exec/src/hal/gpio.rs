//! Raspberry Pi backend
//!
//! Pulse outputs use `rppal`'s software PWM at the 50 Hz servo frame rate; relays are plain
//! digital outputs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, time::Duration};

use log::debug;
use rppal::{gpio::{Gpio, OutputPin}, i2c::I2c};

use super::{HalError, I2cDevice, PulseOutput, RelayOutput};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Servo frame period (50 Hz).
const PULSE_PERIOD: Duration = Duration::from_millis(20);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct GpioPulse {
    pins: HashMap<u8, OutputPin>,
}

pub struct GpioRelay {
    pins: HashMap<u8, OutputPin>,
}

/// An I2C device on the Pi's primary bus.
pub struct GpioI2c {
    bus: I2c,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GpioPulse {
    pub fn new(pins: &[u8]) -> Result<Self, HalError> {
        Ok(Self { pins: output_pins(pins)? })
    }
}

impl GpioRelay {
    pub fn new(pins: &[u8]) -> Result<Self, HalError> {
        Ok(Self { pins: output_pins(pins)? })
    }
}

impl GpioI2c {
    pub fn new(address: u16) -> Result<Self, HalError> {
        let mut bus = I2c::new().map_err(|e| HalError::Attach(e.to_string()))?;
        bus.set_slave_address(address)
            .map_err(|e| HalError::Attach(e.to_string()))?;

        Ok(Self { bus })
    }
}

impl PulseOutput for GpioPulse {
    fn set_pulse_width(&mut self, pin: u8, width_us: u32) -> Result<(), HalError> {
        let out = self.pins.get_mut(&pin).ok_or(HalError::UnknownPin(pin))?;

        if width_us == 0 {
            out.clear_pwm().map_err(|e| HalError::Write { pin, msg: e.to_string() })?;
            out.set_low();
        }
        else {
            out.set_pwm(PULSE_PERIOD, Duration::from_micros(width_us as u64))
                .map_err(|e| HalError::Write { pin, msg: e.to_string() })?;
        }

        Ok(())
    }
}

impl RelayOutput for GpioRelay {
    fn write(&mut self, pin: u8, high: bool) -> Result<(), HalError> {
        let out = self.pins.get_mut(&pin).ok_or(HalError::UnknownPin(pin))?;

        if high {
            out.set_high();
        }
        else {
            out.set_low();
        }

        Ok(())
    }
}

impl I2cDevice for GpioI2c {
    fn write(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        self.bus.write(bytes)
            .map(|_| ())
            .map_err(|e| HalError::I2c(e.to_string()))
    }

    fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), HalError> {
        self.bus.write_read(bytes, buffer)
            .map_err(|e| HalError::I2c(e.to_string()))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn output_pins(pins: &[u8]) -> Result<HashMap<u8, OutputPin>, HalError> {
    let gpio = Gpio::new().map_err(|e| HalError::Attach(e.to_string()))?;

    let mut map = HashMap::new();
    for &pin in pins {
        let mut out = gpio.get(pin)
            .map_err(|e| HalError::Attach(format!("pin {}: {}", pin, e)))?
            .into_output();

        // Leave the pin in its current state when dropped, the controllers restore safe levels
        out.set_reset_on_drop(false);
        map.insert(pin, out);

        debug!("GPIO{} configured as output", pin);
    }

    Ok(map)
}
