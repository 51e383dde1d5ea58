//! # Network Module
//!
//! Parameters shared by the hub and its clients describing where the websocket endpoint lives.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Websocket endpoint parameters, the `[websocket]` table of the hub's parameter file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetParams {
    /// Interface the hub binds to, `0.0.0.0` to accept observers on every interface
    pub host: String,

    pub port: u16,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetParams {
    /// Address to bind the hub's TCP listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Websocket URL a client on `host` should connect to.
    pub fn endpoint(&self, host: &str) -> String {
        format!("ws://{}:{}", host, self.port)
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8765,
        }
    }
}
