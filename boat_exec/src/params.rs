//! # Boat Executable Parameters
//!
//! This module provides parameters for the boat executable, loaded from `boat_exec.toml`. The
//! whole structure is also echoed to observers as the `config` greeting, so every field is
//! serialisable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoatExecParams {
    /// Websocket endpoint the hub serves on
    pub websocket: NetParams,

    pub gps: GpsParams,

    pub pins: PinParams,

    /// Pulse width range accepted by the motor ESCs
    pub esc_range: EscRange,

    pub pump_durations: PumpDurations,

    pub data_logging: DataLoggingParams,

    pub hardware: HardwareParams,

    #[serde(default)]
    pub broadcast: BroadcastParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsParams {
    /// Path to the receiver's serial device, e.g. `/dev/serial0`
    pub port: String,

    pub baudrate: u32,

    /// Time to wait after opening the port before the first read.
    ///
    /// Units: seconds
    #[serde(default = "default_gps_settle_s")]
    pub settle_s: f64,
}

/// BCM GPIO pin numbers of the boat's actuators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinParams {
    pub motor_left: u8,
    pub motor_right: u8,

    /// Pump relay pins, pump `n` is driven by `pumps[n - 1]`
    pub pumps: Vec<u8>,

    #[serde(default = "default_camera_pan")]
    pub camera_pan: u8,

    #[serde(default = "default_camera_tilt")]
    pub camera_tilt: u8,
}

/// Units: microseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EscRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PumpDurations {
    /// Pump run time used when a pump command gives no duration.
    ///
    /// Units: seconds
    pub default: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLoggingParams {
    /// Append-only CSV log of every sample
    pub csv_file: String,

    /// JSON document holding every sample
    #[serde(default = "default_json_file")]
    pub json_file: String,

    /// Directory exports are written into
    #[serde(default = "default_samples_dir")]
    pub samples_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareParams {
    pub backend: Backend,

    /// If true a pump relay is switched on by driving its pin low
    #[serde(default = "default_true")]
    pub relay_active_low: bool,

    /// Video device used by the hardware camera backend
    #[serde(default = "default_video_device")]
    pub video_device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastParams {
    /// Units: seconds
    pub telemetry_period_s: f64,

    /// Units: seconds
    pub video_period_s: f64,

    /// JPEG quality of video frames, between 1 and 100
    pub jpeg_quality: u8,

    /// Units: pixels
    pub video_width: u32,

    /// Units: pixels
    pub video_height: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which implementation of the equipment drivers to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Raspberry Pi GPIO, I2C, V4L2 and UART
    Gpio,

    /// In-memory simulated equipment
    Sim,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for BroadcastParams {
    fn default() -> Self {
        Self {
            telemetry_period_s: 0.1,
            video_period_s: 0.033,
            jpeg_quality: 80,
            video_width: 640,
            video_height: 480,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_gps_settle_s() -> f64 { 2.0 }
fn default_camera_pan() -> u8 { 12 }
fn default_camera_tilt() -> u8 { 13 }
fn default_json_file() -> String { String::from("water_samples.json") }
fn default_samples_dir() -> String { String::from("samples") }
fn default_true() -> bool { true }
fn default_video_device() -> String { String::from("/dev/video0") }

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let params: BoatExecParams = util::params::from_toml_str(r#"
            [websocket]
            host = "0.0.0.0"
            port = 8765

            [gps]
            port = "/dev/serial0"
            baudrate = 9600

            [pins]
            motor_left = 18
            motor_right = 19
            pumps = [5, 6, 26]

            [esc_range]
            min = 1000
            max = 2000

            [pump_durations]
            default = 5.0

            [data_logging]
            csv_file = "samples.csv"

            [hardware]
            backend = "sim"
        "#).unwrap();

        assert_eq!(params.gps.settle_s, 2.0);
        assert_eq!(params.pins.camera_pan, 12);
        assert_eq!(params.pins.camera_tilt, 13);
        assert_eq!(params.pins.pumps, vec![5, 6, 26]);
        assert_eq!(params.hardware.backend, Backend::Sim);
        assert!(params.hardware.relay_active_low);
        assert_eq!(params.data_logging.json_file, "water_samples.json");
        assert_eq!(params.broadcast.jpeg_quality, 80);
    }

    #[test]
    fn test_shipped_params_parse() {
        let params: BoatExecParams = util::params::from_toml_str(
            include_str!("../../params/boat_exec.toml")
        ).unwrap();

        assert_eq!(params.websocket.port, 8765);
        assert!(!params.pins.pumps.is_empty());
    }
}
