//! # Surface Executable Parameters
//!
//! This module provide parameters for the surface console.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceExecParams {
    /// Link to the vehicle
    #[serde(default)]
    pub net: NetParams,

    /// Scripts run on the vehicle for the commands that are not handled by the dropper
    #[serde(default)]
    pub scripts: ScriptParams,

    /// Parameter file of the marker dropper
    #[serde(default = "default_dropper_params")]
    pub dropper_params: String,

    /// Shell used when commands are run locally instead of on the vehicle
    #[serde(default = "default_local_shell")]
    pub local_shell: String,
}

/// Command lines of the vehicle scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptParams {
    /// Interpreter the scripts are run with
    pub python: String,

    /// Winch and thruster control script
    pub control: String,

    /// Temperature reading script
    pub temp: String,

    /// pH reading script
    pub ph: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ScriptParams {
    fn default() -> Self {
        Self {
            python: String::from("python3"),
            control: String::from("~/babyrov/babyrov_control.py"),
            temp: String::from("~/babyrov/temp_reading.py"),
            ph: String::from("~/babyrov/ph_sensor.py"),
        }
    }
}

fn default_dropper_params() -> String {
    String::from("marker_dropper.toml")
}

fn default_local_shell() -> String {
    String::from("sh")
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let params: SurfaceExecParams = serde_json::from_str("{}").unwrap();

        assert_eq!(params.net.shell_endpoint, "tcp://192.168.2.2:5020");
        assert_eq!(params.scripts.python, "python3");
        assert_eq!(params.scripts.ph, "~/babyrov/ph_sensor.py");
        assert_eq!(params.dropper_params, "marker_dropper.toml");
        assert_eq!(params.local_shell, "sh");
    }
}
