//! # Remote Shell Equipment Commands
//!
//! The surface computer asks the BabyROV's onboard computer to run command lines (`pigs`
//! commands, sensor scripts, the winch/thruster script) and receives their output.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::process::Command;

use super::dropper::ActuationResult;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Request sent by the shell client to the server on the vehicle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShellRequest {
    /// The command line to execute
    pub cmd: String,
}

/// Response sent by the shell server once the requested command has finished.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellResponse {
    /// Exit code of the command, or `None` if the command could not be run or was killed by a
    /// signal.
    pub exit_code: Option<i32>,

    /// Standard output of the command, without trailing newlines
    pub stdout: String,

    /// Standard error of the command
    pub stderr: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ShellRequest {
    pub fn new<S: Into<String>>(cmd: S) -> Self {
        Self { cmd: cmd.into() }
    }

    /// Run the command with `shell -c` on this machine and wait for it to finish.
    pub fn execute(&self, shell: &str) -> ShellResponse {
        match Command::new(shell).arg("-c").arg(&self.cmd).output() {
            Ok(out) => ShellResponse {
                exit_code: out.status.code(),
                stdout: String::from_utf8_lossy(&out.stdout)
                    .trim_end_matches(|c: char| c == '\n' || c == '\r')
                    .to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            },
            Err(e) => ShellResponse::not_executed(format!("could not start {}: {}", shell, e)),
        }
    }
}

impl ShellResponse {
    /// Build a response for a request that could not be executed at all.
    pub fn not_executed<S: Into<String>>(reason: S) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    /// Interpret the response as the outcome of an actuation.
    ///
    /// Only a zero exit code counts as success.
    pub fn actuation_result(&self) -> ActuationResult {
        match self.exit_code {
            Some(0) => ActuationResult::Success,
            Some(code) => ActuationResult::Failure(match self.stderr.trim() {
                "" => format!("exit code {}", code),
                e => format!("exit code {}: {}", code, e),
            }),
            None => ActuationResult::Failure(match self.stderr.trim() {
                "" => String::from("command did not exit normally"),
                e => e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_actuation_result() {
        let ok = ShellResponse {
            exit_code: Some(0),
            ..Default::default()
        };
        assert_eq!(ok.actuation_result(), ActuationResult::Success);

        let failed = ShellResponse {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: String::from("socket connect failed\n"),
        };
        assert_eq!(
            failed.actuation_result(),
            ActuationResult::Failure(String::from("exit code 1: socket connect failed"))
        );

        let killed = ShellResponse::not_executed("");
        assert!(!killed.actuation_result().is_success());
    }

    #[test]
    fn test_execute() {
        let resp = ShellRequest::new("echo 21.5").execute("sh");
        assert_eq!(resp.exit_code, Some(0));
        assert_eq!(resp.stdout, "21.5");

        let resp = ShellRequest::new("echo oops >&2; exit 3").execute("sh");
        assert_eq!(resp.exit_code, Some(3));
        assert_eq!(resp.stderr, "oops\n");

        let resp = ShellRequest::new("true").execute("/nonexistent/shell");
        assert_eq!(resp.exit_code, None);
        assert!(!resp.actuation_result().is_success());
    }

    #[test]
    fn test_wire_format() {
        let req = ShellRequest::new("pigs s 18 1100");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"cmd":"pigs s 18 1100"}"#);
    }
}
