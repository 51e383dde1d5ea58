//! # Water Sample Records
//!
//! Records of the water samples collected by the pumps, and the replies sent to observers which
//! query them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single collected water sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Short unique identifier (8 hex characters)
    pub sample_id: String,

    /// RFC 3339 UTC timestamp of collection
    pub timestamp: String,

    /// Pump which collected the sample, starting from 1
    pub pump_id: u8,

    /// Duration the pump ran for.
    ///
    /// Units: seconds
    pub duration: f64,

    pub location: SampleLocation,

    pub environmental: SampleEnvironment,

    pub system: SampleSystem,

    /// Free-form operator notes
    pub notes: String,

    /// Collection status, `"collected"` once logged
    pub status: String,
}

/// Where a sample was collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

/// Environmental conditions at the time of collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleEnvironment {
    pub water_temperature: Option<f64>,
    pub air_temperature: Option<f64>,
    pub weather_conditions: String,
}

/// Boat state at the time of collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSystem {
    pub battery_voltage: Option<f64>,
}

/// Summary statistics over all collected samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStatistics {
    pub total: usize,

    /// Number of samples collected by each pump, keyed by the pump id as a string to match JSON
    /// object keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_pump: BTreeMap<String, usize>,

    /// Number of samples collected on each day, keyed by `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_date: BTreeMap<String, usize>,

    /// Timestamps of the first and last samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

/// An inclusive range of sample timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub first: String,
    pub last: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reply to a `samples` telecommand, tagged with the sub-command it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SamplesData {
    /// All logged samples
    AllSamples { samples: Vec<SampleRecord> },

    /// Statistics over all logged samples
    Statistics { statistics: SampleStatistics },

    /// Result of a GeoJSON export, `file` is `None` if the export failed
    GeojsonExported { file: Option<String>, message: String },

    /// Result of a CSV export, `file` is `None` if the export failed
    CsvExported { file: Option<String>, message: String },
}
