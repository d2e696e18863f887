//! # BabyROV Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
pub struct BabyRovExecParams {
    /// Endpoint the shell server binds to, e.g. `"tcp://*:5020"`
    pub shell_endpoint: String,

    /// Shell used to run the requested commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// How long to wait for a request before checking the link again.
    ///
    /// Units: milliseconds
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: i32,
}

fn default_shell() -> String {
    String::from("sh")
}

fn default_recv_timeout_ms() -> i32 {
    200
}
