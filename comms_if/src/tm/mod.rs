//! # Telemetry module
//!
//! Telemetry is everything the hub sends to its observers. Every message is a JSON envelope of
//! the form `{"type": ..., "data": ...}`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::eqpt::{
    battery::BatteryReading,
    gps::Fix,
    imu::ImuReading,
    sample::SamplesData,
    servo::ServoStatus,
    system::SystemStatus,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A snapshot of every sensor, taken once per telemetry tick.
///
/// Sensors which could not be read this tick are `None` and serialise as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub gps: Option<Fix>,
    pub imu: Option<ImuReading>,
    pub battery: Option<BatteryReading>,
    pub system: Option<SystemStatus>,
    pub servos: ServoStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telemetry envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Tm {
    /// The hub's configuration, sent once to each observer when it connects
    Config(serde_json::Value),

    /// Periodic sensor snapshot
    Telemetry(TelemetrySnapshot),

    /// A JPEG video frame as a `data:image/jpeg;base64,` URI
    Video(String),

    /// Servo pose, sent in reply to every servo telecommand
    ServoStatus(ServoStatus),

    /// Reply to a samples telecommand
    SamplesData(SamplesData),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Tm {
    /// Serialise the envelope into the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse an envelope received from the hub.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}
