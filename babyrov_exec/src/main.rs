//! # BabyROV Executable
//!
//! Runs on the BabyROV's onboard computer. It serves the shell requests of the surface console:
//! servo commands for the marker dropper, the winch and thruster script, and the sensor scripts.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Shell server abstraction.
mod shell_server;

/// Parameters for the BabyROV executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use comms_if::net::zmq;
use log::{debug, info, warn};

// Internal
use params::BabyRovExecParams;
use shell_server::ShellServer;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    let session = Session::new("babyrov_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("BabyROV Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| String::from("unknown host"))
    );
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: BabyRovExecParams =
        util::params::load("babyrov_exec.toml").wrap_err("Could not load babyrov exec params")?;

    info!("Parameters loaded");

    // ---- SERVER INITIALISATION ----

    let ctx = zmq::Context::new();
    let mut server =
        ShellServer::new(&ctx, &params).wrap_err("Failed to initialise the shell server")?;

    info!("Shell server listening on {}", params.shell_endpoint);

    // ---- MAIN LOOP ----

    loop {
        let req = match server.get_request() {
            Some(r) => r,
            None => continue,
        };

        debug!("Running: {}", req.cmd);

        let resp = req.execute(&params.shell);

        if !resp.actuation_result().is_success() {
            warn!("`{}` failed: {}", req.cmd, resp.actuation_result());
        }

        if let Err(e) = server.send_response(&resp) {
            warn!("Couldn't send response to client: {}", e);
        }
    }
}
