//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications interface. A telecommand
//! is an instruction sent to the boat by an observer, encoded as a JSON envelope discriminated by
//! its `type` field:
//!
//! ```json
//! {"type": "control", "command": "forward"}
//! {"type": "servo", "command": "pan", "value": {"direction": "left", "step": 2}}
//! {"type": "pump", "pump_id": 1, "duration": 5}
//! {"type": "samples", "command": "get_statistics"}
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod motor;
pub mod samples;
pub mod servo;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde_json::{self, json, Value};
use thiserror::Error;

// Internal
pub use motor::MotorCmd;
pub use samples::SamplesCmd;
pub use servo::{PanDirection, ServoCmd, TiltDirection};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the boat by an observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Tc {
    /// Drive the propulsion motors
    Control(MotorCmd),

    /// Move the camera servos
    Servo(ServoCmd),

    /// Run a sampling pump
    Pump {
        /// Pump to activate, valid pumps are numbered from 1
        pump_id: i64,

        /// How long to run the pump for, or `None` for the configured default.
        ///
        /// Units: seconds
        duration_s: Option<f64>,
    },

    /// Query or export the sample log
    Samples(SamplesCmd),
}

/// Telecommand types.
///
/// The type is used to identify the purpose of the telecommand, and is used by the dispatcher to
/// determine where to send the command.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TcType {
    Control,
    Servo,
    Pump,
    Samples,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0:?} has an invalid payload: {1}")]
    InvalidPayload(TcType, String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        // Get the type of the TC
        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };
        let tc_type = match TcType::from_str(type_str) {
            Some(t) => t,
            None => return Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", type_str)
            ))
        };

        let invalid = |msg: String| TcParseError::InvalidPayload(tc_type, msg);

        match tc_type {
            TcType::Control => {
                let cmd_str = val["command"].as_str()
                    .ok_or_else(|| invalid("expected \"command\" to be a string".into()))?;

                MotorCmd::from_str(cmd_str)
                    .map(Tc::Control)
                    .ok_or_else(|| invalid(format!("unknown motor command {:?}", cmd_str)))
            },
            TcType::Servo => {
                ServoCmd::from_json(&val["command"], &val["value"])
                    .map(Tc::Servo)
                    .map_err(invalid)
            },
            TcType::Pump => {
                let pump_id = as_integer(&val["pump_id"])
                    .ok_or_else(|| invalid("expected \"pump_id\" to be an integer".into()))?;

                let duration_s = match &val["duration"] {
                    Value::Null => None,
                    v => Some(v.as_f64()
                        .ok_or_else(|| invalid("expected \"duration\" to be a number".into()))?)
                };

                Ok(Tc::Pump { pump_id, duration_s })
            },
            TcType::Samples => {
                let cmd_str = val["command"].as_str()
                    .ok_or_else(|| invalid("expected \"command\" to be a string".into()))?;

                SamplesCmd::from_str(cmd_str)
                    .map(Tc::Samples)
                    .ok_or_else(|| invalid(format!("unknown samples command {:?}", cmd_str)))
            }
        }
    }

    /// Encode this TC as a JSON envelope.
    pub fn to_json(&self) -> String {
        let val = match self {
            Tc::Control(cmd) => json!({
                "type": TcType::Control.as_str(),
                "command": cmd.as_str()
            }),
            Tc::Servo(cmd) => {
                let (command, value) = cmd.to_json();
                json!({
                    "type": TcType::Servo.as_str(),
                    "command": command,
                    "value": value
                })
            },
            Tc::Pump { pump_id, duration_s: Some(d) } => json!({
                "type": TcType::Pump.as_str(),
                "pump_id": pump_id,
                "duration": d
            }),
            Tc::Pump { pump_id, duration_s: None } => json!({
                "type": TcType::Pump.as_str(),
                "pump_id": pump_id
            }),
            Tc::Samples(cmd) => json!({
                "type": TcType::Samples.as_str(),
                "command": cmd.as_str()
            }),
        };

        val.to_string()
    }

    /// Get the type of this TC.
    pub fn tc_type(&self) -> TcType {
        match self {
            Tc::Control(_) => TcType::Control,
            Tc::Servo(_) => TcType::Servo,
            Tc::Pump { .. } => TcType::Pump,
            Tc::Samples(_) => TcType::Samples,
        }
    }
}

impl TcType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "control" => Some(TcType::Control),
            "servo" => Some(TcType::Servo),
            "pump" => Some(TcType::Pump),
            "samples" => Some(TcType::Samples),
            _ => None
        }
    }

    /// The `type` discriminant used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TcType::Control => "control",
            TcType::Servo => "servo",
            TcType::Pump => "pump",
            TcType::Samples => "samples",
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Read an integer, accepting floats with no fractional part as browsers may send `2.0`.
fn as_integer(val: &Value) -> Option<i64> {
    match val.as_i64() {
        Some(i) => Some(i),
        None => val.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_control() {
        assert_eq!(
            Tc::from_json(r#"{"type": "control", "command": "forward"}"#).unwrap(),
            Tc::Control(MotorCmd::Forward)
        );

        assert!(matches!(
            Tc::from_json(r#"{"type": "control", "command": "reverse"}"#),
            Err(TcParseError::InvalidPayload(TcType::Control, _))
        ));
    }

    #[test]
    fn test_parse_pump() {
        assert_eq!(
            Tc::from_json(r#"{"type": "pump", "pump_id": 2, "duration": 3.5}"#).unwrap(),
            Tc::Pump { pump_id: 2, duration_s: Some(3.5) }
        );
        assert_eq!(
            Tc::from_json(r#"{"type": "pump", "pump_id": 1.0}"#).unwrap(),
            Tc::Pump { pump_id: 1, duration_s: None }
        );

        // Out of range ids are a validation matter for the pumps, not a parse error
        assert_eq!(
            Tc::from_json(r#"{"type": "pump", "pump_id": 0}"#).unwrap(),
            Tc::Pump { pump_id: 0, duration_s: None }
        );

        assert!(matches!(
            Tc::from_json(r#"{"type": "pump", "pump_id": "one"}"#),
            Err(TcParseError::InvalidPayload(TcType::Pump, _))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "pump", "pump_id": 1, "duration": "long"}"#),
            Err(TcParseError::InvalidPayload(TcType::Pump, _))
        ));
    }

    #[test]
    fn test_parse_samples() {
        assert_eq!(
            Tc::from_json(r#"{"type": "samples", "command": "export_geojson"}"#).unwrap(),
            Tc::Samples(SamplesCmd::ExportGeojson)
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Tc::from_json("{not json"),
            Err(TcParseError::InvalidJson(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "warp_drive"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"command": "forward"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json("[1, 2, 3]"),
            Err(TcParseError::InvalidType(_))
        ));
    }

    #[test]
    fn test_to_json_is_parseable() {
        let tcs = vec![
            Tc::Control(MotorCmd::Stop),
            Tc::Servo(ServoCmd::Pan { direction: PanDirection::Left, step: 2.0 }),
            Tc::Servo(ServoCmd::Center),
            Tc::Pump { pump_id: 3, duration_s: Some(4.0) },
            Tc::Pump { pump_id: 1, duration_s: None },
            Tc::Samples(SamplesCmd::GetAll),
        ];

        for tc in tcs {
            assert_eq!(Tc::from_json(&tc.to_json()).unwrap(), tc);
        }
    }
}
