//! # Motor Control Module
//!
//! Differential drive through two ESCs. Commands are stateless: each one writes a pulse width to
//! both ESCs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::MotorCmd;
use log::{debug, info};
use std::sync::Mutex;

use crate::{
    hal::{HalError, PulseOutput},
    params::EscRange,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct MotorCtrl {
    left_pin: u8,
    right_pin: u8,
    esc_range: EscRange,
    driver: Mutex<Box<dyn PulseOutput>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorCtrl {
    /// Create a new controller with both motors stopped.
    pub fn new(
        driver: Box<dyn PulseOutput>,
        left_pin: u8,
        right_pin: u8,
        esc_range: EscRange
    ) -> Result<Self, HalError> {
        let ctrl = Self {
            left_pin,
            right_pin,
            esc_range,
            driver: Mutex::new(driver),
        };

        ctrl.stop()?;

        info!("Motors initialised on left GPIO{}, right GPIO{}", left_pin, right_pin);

        Ok(ctrl)
    }

    /// Pulse widths for the left and right ESCs for a command.
    ///
    /// Units: microseconds
    pub fn pulses(&self, cmd: MotorCmd) -> (u32, u32) {
        let EscRange { min, max } = self.esc_range;
        let mid = (min + max) / 2;

        match cmd {
            MotorCmd::Forward => (max, max),
            MotorCmd::Backward => (mid, mid),
            MotorCmd::Left => (min, max),
            MotorCmd::Right => (max, min),
            MotorCmd::Stop => (min, min),
        }
    }

    pub fn handle_command(&self, cmd: MotorCmd) -> Result<(), HalError> {
        let (left, right) = self.pulses(cmd);

        let mut driver = self.driver.lock().unwrap_or_else(|e| e.into_inner());
        driver.set_pulse_width(self.left_pin, left)?;
        driver.set_pulse_width(self.right_pin, right)?;

        debug!("Motors {}: left {} us, right {} us", cmd.as_str(), left, right);

        Ok(())
    }

    pub fn stop(&self) -> Result<(), HalError> {
        self.handle_command(MotorCmd::Stop)
    }
}
