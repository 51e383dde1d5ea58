//! # Equipment Interface
//!
//! This module defines the data structures produced by the boat's equipment, which are carried
//! inside telemetry and reply envelopes.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod battery;
pub mod cam;
pub mod gps;
pub mod imu;
pub mod sample;
pub mod servo;
pub mod system;
