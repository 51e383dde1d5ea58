//! # Camera servo telecommands
//!
//! Servo commands arrive as a `command` string plus a `value` object carrying the arguments, for
//! example `{"command": "pan", "value": {"direction": "left", "step": 2}}`. Commands without
//! arguments may send `value` as `{}` or omit it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde_json::{json, Value};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Step used by `pan` and `tilt` when none is given.
///
/// Units: degrees
pub const DEFAULT_STEP_DEG: f64 = 1.0;

/// Number of interpolation steps used by `smooth` when none is given.
pub const DEFAULT_SMOOTH_STEPS: u32 = 20;

/// Delay between interpolation steps used by `smooth` when none is given.
///
/// Units: seconds
pub const DEFAULT_SMOOTH_DELAY_S: f64 = 0.02;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ServoCmd {
    /// Move the pan axis by `step` degrees
    Pan { direction: PanDirection, step: f64 },

    /// Move the tilt axis by `step` degrees
    Tilt { direction: TiltDirection, step: f64 },

    /// Set the absolute pan angle
    SetPan { angle: f64 },

    /// Set the absolute tilt angle
    SetTilt { angle: f64 },

    /// Centre both axes
    Center,

    /// Move to a named preset pose. Unknown names are rejected by the servo controller, not at
    /// parse time.
    Preset { name: String },

    /// Interpolate to the target pose over `steps` steps
    Smooth { pan: f64, tilt: f64, steps: u32, delay_s: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PanDirection {
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TiltDirection {
    Up,
    Down,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoCmd {
    /// Parse a servo command from the `command` and `value` members of an envelope.
    pub(crate) fn from_json(command: &Value, value: &Value) -> Result<Self, String> {
        let command = command.as_str()
            .ok_or_else(|| String::from("expected \"command\" to be a string"))?;

        let field = |name: &str| -> &Value {
            match value {
                Value::Object(map) => map.get(name).unwrap_or(&Value::Null),
                _ => &Value::Null,
            }
        };

        match command {
            "pan" => {
                let direction = match field("direction").as_str() {
                    Some("left") => PanDirection::Left,
                    Some("right") => PanDirection::Right,
                    d => return Err(format!("invalid pan direction {:?}", d)),
                };
                Ok(ServoCmd::Pan {
                    direction,
                    step: opt_f64(field("step"), "step")?.unwrap_or(DEFAULT_STEP_DEG),
                })
            },
            "tilt" => {
                let direction = match field("direction").as_str() {
                    Some("up") => TiltDirection::Up,
                    Some("down") => TiltDirection::Down,
                    d => return Err(format!("invalid tilt direction {:?}", d)),
                };
                Ok(ServoCmd::Tilt {
                    direction,
                    step: opt_f64(field("step"), "step")?.unwrap_or(DEFAULT_STEP_DEG),
                })
            },
            "set_pan" => Ok(ServoCmd::SetPan { angle: req_f64(field("angle"), "angle")? }),
            "set_tilt" => Ok(ServoCmd::SetTilt { angle: req_f64(field("angle"), "angle")? }),
            "center" => Ok(ServoCmd::Center),
            "preset" => {
                let name = field("name").as_str()
                    .ok_or_else(|| String::from("expected \"name\" to be a string"))?;
                Ok(ServoCmd::Preset { name: String::from(name) })
            },
            "smooth" => {
                let steps = match field("steps") {
                    Value::Null => DEFAULT_SMOOTH_STEPS,
                    v => v.as_u64()
                        .filter(|s| *s <= u32::MAX as u64)
                        .ok_or_else(|| String::from("expected \"steps\" to be a positive integer"))?
                        as u32,
                };
                Ok(ServoCmd::Smooth {
                    pan: req_f64(field("pan"), "pan")?,
                    tilt: req_f64(field("tilt"), "tilt")?,
                    steps,
                    delay_s: opt_f64(field("delay"), "delay")?.unwrap_or(DEFAULT_SMOOTH_DELAY_S),
                })
            },
            c => Err(format!("unknown servo command {:?}", c)),
        }
    }

    /// Encode the command as its `(command, value)` envelope members.
    pub(crate) fn to_json(&self) -> (&'static str, Value) {
        match self {
            ServoCmd::Pan { direction, step } => ("pan", json!({
                "direction": match direction {
                    PanDirection::Left => "left",
                    PanDirection::Right => "right",
                },
                "step": step
            })),
            ServoCmd::Tilt { direction, step } => ("tilt", json!({
                "direction": match direction {
                    TiltDirection::Up => "up",
                    TiltDirection::Down => "down",
                },
                "step": step
            })),
            ServoCmd::SetPan { angle } => ("set_pan", json!({ "angle": angle })),
            ServoCmd::SetTilt { angle } => ("set_tilt", json!({ "angle": angle })),
            ServoCmd::Center => ("center", json!({})),
            ServoCmd::Preset { name } => ("preset", json!({ "name": name.as_str() })),
            ServoCmd::Smooth { pan, tilt, steps, delay_s } => ("smooth", json!({
                "pan": pan,
                "tilt": tilt,
                "steps": steps,
                "delay": delay_s
            })),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn req_f64(val: &Value, name: &str) -> Result<f64, String> {
    val.as_f64().ok_or_else(|| format!("expected \"{}\" to be a number", name))
}

fn opt_f64(val: &Value, name: &str) -> Result<Option<f64>, String> {
    match val {
        Value::Null => Ok(None),
        v => req_f64(v, name).map(Some),
    }
}
