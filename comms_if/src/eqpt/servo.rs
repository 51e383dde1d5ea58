//! # Camera Servo Data

use serde::{Deserialize, Serialize};

/// Snapshot of the camera pan/tilt servos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ServoStatus {
    /// Commanded pan angle in degrees, between 0 and 180
    pub pan_angle: f64,

    /// Commanded tilt angle in degrees, between 0 and 180
    pub tilt_angle: f64,

    /// GPIO pin driving the pan servo
    pub pan_pin: u8,

    /// GPIO pin driving the tilt servo
    pub tilt_pin: u8,
}
