//! # Boat library
//!
//! This library allows other crates in the workspace, and the integration tests, to access items
//! defined inside the boat executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Broadcast loops - periodic telemetry and video fan-out
pub mod broadcast;

/// Components - the boat's devices created from the parameters
pub mod components;

/// Command dispatcher - executes telecommands from observers
pub mod dispatcher;

/// GPS - NMEA parsing and the receiver session
pub mod gps;

/// Hardware abstraction layer - GPIO pulse, relay and I2C outputs, real or simulated
pub mod hal;

/// Hub - websocket server tying everything together
pub mod hub;

/// Motor control - differential drive through two ESCs
pub mod motor_ctrl;

/// Executable parameters
pub mod params;

/// Pump control - timed activation of the sampling pumps
pub mod pump_ctrl;

/// Connection registry - the connected observers and their outbound queues
pub mod registry;

/// Sample log - persistence and export of collected water samples
pub mod sample_log;

/// Sensors - IMU, battery, system stats and camera
pub mod sensors;

/// Servo control - camera pan/tilt state machine
pub mod servo_ctrl;
