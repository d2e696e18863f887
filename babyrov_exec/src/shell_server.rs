//! # Shell Server Module
//!
//! Networking side of the BabyROV executable. The server accepts command lines from the shell
//! client in the surface console and replies with their result once they have run.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::shell::{ShellRequest, ShellResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::{trace, warn};

use crate::params::BabyRovExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// REP server which receives shell requests from the surface.
///
/// Every request returned by [`ShellServer::get_request`] must be answered with
/// [`ShellServer::send_response`] before the next one can be received.
pub struct ShellServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ShellServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send data to the client: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ShellServer {
    /// Create a new instance of the shell server.
    ///
    /// Does not wait for a client to connect.
    pub fn new(ctx: &zmq::Context, params: &BabyRovExecParams) -> Result<Self, ShellServerError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: params.recv_timeout_ms,
            send_timeout: 100,
            linger: 1,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, &params.shell_endpoint)?;

        Ok(Self { socket })
    }

    /// Wait for the next request from the client.
    ///
    /// Returns `None` if nothing arrived before the receive timeout. Malformed requests are
    /// answered immediately and also give `None`.
    pub fn get_request(&mut self) -> Option<ShellRequest> {
        let msg = match self.socket.recv_msg(0) {
            Ok(m) => m,
            Err(zmq::Error::EAGAIN) => return None,
            Err(e) => {
                warn!("Could not read from the shell socket: {}", e);
                return None;
            }
        };

        trace!("-> {:?}", msg.as_str());

        match serde_json::from_str::<ShellRequest>(msg.as_str().unwrap_or("")) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Could not deserialize request: {}", e);
                if let Err(e) = self.send_response(&ShellResponse::not_executed(format!(
                    "malformed request: {}",
                    e
                ))) {
                    warn!("Could not reject the malformed request: {}", e);
                }
                None
            }
        }
    }

    /// Send the result of the last request to the client.
    pub fn send_response(&mut self, response: &ShellResponse) -> Result<(), ShellServerError> {
        let resp_str =
            serde_json::to_string(response).map_err(ShellServerError::SerializationError)?;

        trace!("<- {}", resp_str);

        self.socket
            .send(&resp_str, 0)
            .map_err(ShellServerError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn params(endpoint: &str) -> BabyRovExecParams {
        BabyRovExecParams {
            shell_endpoint: endpoint.to_string(),
            shell: String::from("sh"),
            recv_timeout_ms: 100,
        }
    }

    fn next_request(server: &mut ShellServer) -> ShellRequest {
        for _ in 0..50 {
            if let Some(r) = server.get_request() {
                return r;
            }
        }
        panic!("No request received");
    }

    #[test]
    fn test_request_response() {
        let ctx = zmq::Context::new();
        let mut server = ShellServer::new(&ctx, &params("inproc://shell_server_test")).unwrap();

        let client = ctx.socket(zmq::REQ).unwrap();
        client.connect("inproc://shell_server_test").unwrap();

        client.send(r#"{"cmd":"echo 6.5"}"#, 0).unwrap();
        let req = next_request(&mut server);
        assert_eq!(req.cmd, "echo 6.5");
        server.send_response(&req.execute("sh")).unwrap();

        let resp: ShellResponse =
            serde_json::from_str(client.recv_string(0).unwrap().unwrap().as_str()).unwrap();
        assert_eq!(resp.exit_code, Some(0));
        assert_eq!(resp.stdout, "6.5");
    }

    #[test]
    fn test_malformed_request_rejected() {
        let ctx = zmq::Context::new();
        let mut server = ShellServer::new(&ctx, &params("inproc://shell_server_bad")).unwrap();

        let client = ctx.socket(zmq::REQ).unwrap();
        client.connect("inproc://shell_server_bad").unwrap();

        client.send("pigs s 18 1500", 0).unwrap();
        for _ in 0..10 {
            assert!(server.get_request().is_none());
        }

        let resp: ShellResponse =
            serde_json::from_str(client.recv_string(0).unwrap().unwrap().as_str()).unwrap();
        assert_eq!(resp.exit_code, None);
        assert!(resp.stderr.starts_with("malformed request"));
    }
}
