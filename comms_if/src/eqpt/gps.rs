//! # GPS Equipment Data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A GPS position solution.
///
/// When `fix` is `false` the position fields carry no meaning and must be treated as absent, use
/// [`Fix::position`] rather than reading them directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in degrees, positive north
    pub lat: f64,

    /// Longitude in degrees, positive east
    pub lon: f64,

    /// Altitude above mean sea level in meters
    pub alt: f64,

    /// Number of satellites used in the solution
    pub satellites: u32,

    /// True if the receiver has resolved a valid position
    pub fix: bool,
}

/// A geographic position taken from a valid fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Altitude in meters
    pub alt: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Fix {
    /// A fix marker for when the receiver has no position solution.
    pub fn no_fix() -> Self {
        Self::default()
    }

    /// The position of this fix, or `None` if there is no valid solution.
    pub fn position(&self) -> Option<Position> {
        if self.fix {
            Some(Position {
                lat: self.lat,
                lon: self.lon,
                alt: self.alt,
            })
        } else {
            None
        }
    }
}
