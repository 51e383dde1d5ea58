//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the boat software: the envelopes exchanged
//! between the hub and its observers, and the equipment data carried inside them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands, sent by observers to the hub
pub mod tc;

/// Telemetry, sent by the hub to observers
pub mod tm;

/// Data structures for equipment (sensors, servos, cameras, samples)
pub mod eqpt;

/// Network module
pub mod net;
