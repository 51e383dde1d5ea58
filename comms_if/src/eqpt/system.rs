//! # System Status Data

use serde::{Deserialize, Serialize};

/// Health of the onboard computer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// CPU temperature in degrees Celsius, if the platform exposes one
    pub cpu_temp: Option<f64>,

    /// CPU usage in percent
    pub cpu_usage: f64,

    /// Memory usage in percent
    pub memory_usage: f64,

    /// Root filesystem usage in percent
    pub disk_usage: f64,

    /// Hub uptime, formatted as `"{h}h {m}m {s}s"`
    pub uptime: String,
}
