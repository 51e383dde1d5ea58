//! # IMU Equipment Data

use serde::{Deserialize, Serialize};

/// A three-axis measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One reading of the inertial measurement unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuReading {
    /// Linear acceleration.
    ///
    /// Units: meters/second^2
    pub accel: Vec3,

    /// Angular rate.
    ///
    /// Units: degrees/second
    pub gyro: Vec3,

    /// Die temperature.
    ///
    /// Units: degrees Celsius
    pub temp: f64,
}
