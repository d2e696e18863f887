//! Host platform utility functions

use std::{env, path::PathBuf};

/// Environment variable pointing at the root of the BabyROV software tree.
pub const SW_ROOT_ENV_VAR: &str = "BABYROV_SW_ROOT";

/// Get the root of the software tree, which holds the `params` and `sessions` directories.
pub fn get_babyrov_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get the name of the machine we're running on, if it can be determined.
pub fn get_hostname() -> Option<String> {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
