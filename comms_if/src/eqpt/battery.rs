//! # Battery Equipment Data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One reading of the battery monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    /// Pack voltage in volts
    pub voltage: f64,

    /// Estimated state of charge, 0 to 100
    pub percentage: u8,

    /// Coarse health of the pack derived from the percentage
    pub status: BatteryStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Coarse battery status shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryStatus {
    Good,
    Fair,
    Low,
    Critical,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BatteryStatus {
    /// Classify a state of charge percentage.
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            60..=u8::MAX => BatteryStatus::Good,
            30..=59 => BatteryStatus::Fair,
            10..=29 => BatteryStatus::Low,
            _ => BatteryStatus::Critical,
        }
    }
}
