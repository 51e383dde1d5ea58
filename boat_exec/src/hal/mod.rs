//! # Hardware Abstraction Layer
//!
//! Narrow traits over the boat's GPIO and I2C hardware, so that the controllers can be driven by
//! either the Raspberry Pi peripherals or an in-memory simulation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated pins which record every write
pub mod sim;

/// Raspberry Pi backend using `rppal`
#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub mod gpio;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::params::Backend;
use log::info;

pub use sim::{PinWrite, SimPins};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Servo-style pulse output, used for ESCs and camera servos.
pub trait PulseOutput: Send {
    /// Set the pulse width on `pin`. A width of 0 disables the output.
    ///
    /// Units: microseconds
    fn set_pulse_width(&mut self, pin: u8, width_us: u32) -> Result<(), HalError>;
}

/// Digital output driving a relay.
pub trait RelayOutput: Send {
    /// Drive `pin` high (`true`) or low (`false`).
    fn write(&mut self, pin: u8, high: bool) -> Result<(), HalError>;
}

/// A single device on an I2C bus, addressed at construction.
pub trait I2cDevice: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), HalError>;

    /// Write `bytes` then read `buffer.len()` bytes back without releasing the bus.
    fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), HalError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("Could not attach to the hardware backend: {0}")]
    Attach(String),

    #[error("Pin {0} is not configured as an output")]
    UnknownPin(u8),

    #[error("Write to pin {pin} failed: {msg}")]
    Write { pin: u8, msg: String },

    #[error("I2C transfer failed: {0}")]
    I2c(String),

    #[error("The GPIO backend is only available on a Raspberry Pi")]
    Unsupported,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a pulse output driving `pins` on the chosen backend.
pub fn pulse_output(
    backend: Backend,
    pins: &[u8],
    sim: &SimPins
) -> Result<Box<dyn PulseOutput>, HalError> {
    match backend {
        Backend::Sim => Ok(Box::new(sim.clone())),
        Backend::Gpio => gpio_pulse_output(pins),
    }
}

/// Create a relay output driving `pins` on the chosen backend, with every pin initially at
/// `initial_high`.
pub fn relay_output(
    backend: Backend,
    pins: &[u8],
    initial_high: bool,
    sim: &SimPins
) -> Result<Box<dyn RelayOutput>, HalError> {
    let mut relay: Box<dyn RelayOutput> = match backend {
        Backend::Sim => Box::new(sim.clone()),
        Backend::Gpio => gpio_relay_output(pins)?,
    };

    for &pin in pins {
        relay.write(pin, initial_high)?;
    }

    info!("Relay outputs attached on pins {:?}", pins);

    Ok(relay)
}

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
fn gpio_pulse_output(pins: &[u8]) -> Result<Box<dyn PulseOutput>, HalError> {
    Ok(Box::new(gpio::GpioPulse::new(pins)?))
}

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
fn gpio_relay_output(pins: &[u8]) -> Result<Box<dyn RelayOutput>, HalError> {
    Ok(Box::new(gpio::GpioRelay::new(pins)?))
}

#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
fn gpio_pulse_output(_pins: &[u8]) -> Result<Box<dyn PulseOutput>, HalError> {
    Err(HalError::Unsupported)
}

#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
fn gpio_relay_output(_pins: &[u8]) -> Result<Box<dyn RelayOutput>, HalError> {
    Err(HalError::Unsupported)
}
