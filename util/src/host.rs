//! Host platform (linux for example) utility functions

use std::path::PathBuf;

/// Environment variable pointing at the root of the software checkout. Parameter files are read
/// from `$AQUABOT_SW_ROOT/params` and sessions are written to `$AQUABOT_SW_ROOT/sessions`.
pub const SW_ROOT_ENV_VAR: &str = "AQUABOT_SW_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the software root directory from the environment.
pub fn get_aquabot_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
