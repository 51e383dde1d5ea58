//! # Motor control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A drive command for the two propulsion motors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, StructOpt)]
pub enum MotorCmd {
    /// Both motors at full speed
    Forward,

    /// Both motors at the midpoint of the ESC range
    Backward,

    /// Left motor stopped, right motor at full speed
    Left,

    /// Right motor stopped, left motor at full speed
    Right,

    /// Both motors stopped
    Stop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorCmd {
    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(MotorCmd::Forward),
            "backward" => Some(MotorCmd::Backward),
            "left" => Some(MotorCmd::Left),
            "right" => Some(MotorCmd::Right),
            "stop" => Some(MotorCmd::Stop),
            _ => None,
        }
    }

    /// The command string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MotorCmd::Forward => "forward",
            MotorCmd::Backward => "backward",
            MotorCmd::Left => "left",
            MotorCmd::Right => "right",
            MotorCmd::Stop => "stop",
        }
    }
}
