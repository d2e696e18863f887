//! # Shell Client
//!
//! This module provides the channel used to run command lines on the BabyROV's onboard computer,
//! either through the shell server running in `babyrov_exec` or directly on the local machine.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::shell::{ShellRequest, ShellResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, trace};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can execute command lines on the vehicle.
pub trait RemoteExec {
    /// Execute `cmd` and wait for it to finish.
    ///
    /// An `Ok` only means that the command ran; whether it succeeded is given by the response.
    fn exec(&mut self, cmd: &str) -> Result<ShellResponse, ShellClientError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client for the shell server on the vehicle.
pub struct ShellClient {
    socket: MonitoredSocket,
}

/// Runs commands with the shell of the machine the console is running on.
///
/// Useful when the console is run on the vehicle itself.
pub struct LocalShell {
    shell: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ShellClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not send the request to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("No response from the server before the timeout")]
    Timeout,

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The server sent a message which was not valid UTF-8")]
    NonUtf8Response,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ShellClient {
    /// Create a new instance of the shell client.
    ///
    /// Blocks until the server is reached or the connect timeout elapses.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, ShellClientError> {
        let socket_options = SocketOptions {
            connect_timeout: params.connect_timeout_ms,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: params.recv_timeout_ms,
            send_timeout: params.send_timeout_ms,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REQ, socket_options, &params.shell_endpoint)
            .map_err(ShellClientError::SocketError)?;

        Ok(Self { socket })
    }
}

impl RemoteExec for ShellClient {
    fn exec(&mut self, cmd: &str) -> Result<ShellResponse, ShellClientError> {
        if !self.socket.connected() {
            return Err(ShellClientError::NotConnected);
        }

        let req_str = serde_json::to_string(&ShellRequest::new(cmd))
            .map_err(ShellClientError::SerializationError)?;

        trace!("-> {}", req_str);

        self.socket
            .send(&req_str, 0)
            .map_err(ShellClientError::SendError)?;

        let msg = match self.socket.recv_msg(0) {
            Ok(m) => m,
            Err(zmq::Error::EAGAIN) => return Err(ShellClientError::Timeout),
            Err(e) => return Err(ShellClientError::RecvError(e)),
        };

        let resp_str = msg.as_str().ok_or(ShellClientError::NonUtf8Response)?;

        trace!("<- {}", resp_str);

        serde_json::from_str(resp_str).map_err(ShellClientError::DeserializeError)
    }
}

impl LocalShell {
    pub fn new<S: Into<String>>(shell: S) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl RemoteExec for LocalShell {
    fn exec(&mut self, cmd: &str) -> Result<ShellResponse, ShellClientError> {
        debug!("Running locally: {}", cmd);

        Ok(ShellRequest::new(cmd).execute(&self.shell))
    }
}

impl<E: RemoteExec + ?Sized> RemoteExec for Box<E> {
    fn exec(&mut self, cmd: &str) -> Result<ShellResponse, ShellClientError> {
        (**self).exec(cmd)
    }
}

// ------------------------------------------------------------------------------------------------
// TEST HELPERS
// ------------------------------------------------------------------------------------------------

/// A stand-in for the vehicle which answers from a script of responses.
#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct ScriptedExec {
        /// Commands received, in order
        pub cmds: Vec<String>,

        /// Answers to give, in order. When empty every command succeeds with no output.
        pub answers: VecDeque<Result<ShellResponse, ShellClientError>>,
    }

    impl ScriptedExec {
        pub fn ok(mut self, stdout: &str) -> Self {
            self.answers.push_back(Ok(ShellResponse {
                exit_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }));
            self
        }

        pub fn exit(mut self, code: i32, stderr: &str) -> Self {
            self.answers.push_back(Ok(ShellResponse {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }));
            self
        }

        pub fn err(mut self, e: ShellClientError) -> Self {
            self.answers.push_back(Err(e));
            self
        }
    }

    impl RemoteExec for ScriptedExec {
        fn exec(&mut self, cmd: &str) -> Result<ShellResponse, ShellClientError> {
            self.cmds.push(cmd.to_string());

            match self.answers.pop_front() {
                Some(a) => a,
                None => Ok(ShellResponse {
                    exit_code: Some(0),
                    ..Default::default()
                }),
            }
        }
    }
}
