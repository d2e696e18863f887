//! # Surface Console Executable
//!
//! Interactive console run on the surface computer to operate the BabyROV. Each line typed by the
//! operator is parsed into a telecommand and executed on the vehicle, either through the shell
//! server in `babyrov_exec` or with a local shell when the console runs on the vehicle itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use comms_if::{
    net::zmq,
    tc::{Tc, TcParseError},
};
use surface_lib::{
    dropper_session::DropperSession,
    marker_dropper::{self, MarkerDropper},
    params::SurfaceExecParams,
    shell_client::{LocalShell, RemoteExec, ShellClient},
    tc_processor::{self, SurfaceContext},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "BabyROV $ ";

/// History file, relative to the software root
const HISTORY_PATH: &str = "sessions/console_history.txt";

const HELP: &str = "\
Commands:
    drop <red|black>    Drop the next marker of the given colour
    home                Rotate the marker dropper to its home position
    status              Show the markers left in the dropper
    fwd <winch> <thr>   Unreel the winch and drive the thruster (speeds 0-255)
    back <winch>        Stop the thruster and reel in (speed 0-255)
    stop                Stop the winch and the thruster
    temp                Take a temperature reading
    ph                  Take a pH reading
    phsetup             Set up the pH sensor ADC, needed once after power on
    help                Show this message
    quit                Exit the console";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "surface_exec", about = "BabyROV surface console")]
struct Opts {
    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "surface_exec.toml")]
    params: String,

    /// Run commands with a local shell instead of sending them to the vehicle
    #[structopt(long)]
    local: bool,

    /// Log debug messages
    #[structopt(short, long)]
    verbose: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("surface_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(
        if opts.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("BabyROV Surface Console\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| String::from("unknown host"))
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: SurfaceExecParams =
        util::params::load(&opts.params).wrap_err("Could not load surface exec params")?;
    let dropper_params: marker_dropper::Params = util::params::load(&params.dropper_params)
        .wrap_err("Could not load marker dropper params")?;

    info!("Parameters loaded");

    // ---- INITIALISE THE VEHICLE LINK ----

    // Kept alive until the end of main
    let zmq_ctx = zmq::Context::new();

    let exec: Box<dyn RemoteExec> = if opts.local {
        info!("Running commands locally with {}", params.local_shell);
        Box::new(LocalShell::new(params.local_shell.clone()))
    } else {
        info!("Connecting to the vehicle at {}", params.net.shell_endpoint);
        Box::new(
            ShellClient::new(&zmq_ctx, &params.net)
                .wrap_err("Could not connect to the vehicle")?,
        )
    };

    // ---- INITIALISE THE DROPPER ----

    let dropper =
        MarkerDropper::from_params(&dropper_params).wrap_err("Invalid marker dropper params")?;

    info!(
        "Marker dropper loaded with {} red and {} black markers",
        dropper_params.red_slots.len(),
        dropper_params.black_slots.len()
    );

    let ctx = SurfaceContext {
        dropper: DropperSession::new(dropper, exec),
        scripts: params.scripts.clone(),
    };

    if dropper_params.home_on_start {
        match tc_processor::exec(&ctx, &Tc::DropperHome) {
            Ok(r) => info!("{}", r),
            Err(e) => warn!("Could not home the dropper: {}", e),
        }
    }

    // ---- CONSOLE LOOP ----

    let mut rl = DefaultEditor::new().wrap_err("Could not start the console")?;

    let history_path: Option<PathBuf> = host::get_babyrov_sw_root()
        .ok()
        .map(|root| root.join(HISTORY_PATH));
    if let Some(ref path) = history_path {
        if rl.load_history(path).is_err() {
            info!("No console history found");
        }
    }

    info!("Initialisation complete, type \"help\" for the list of commands");

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!("Console error: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        match line {
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                continue;
            }
            _ => (),
        }

        let tc = match Tc::parse(line) {
            Ok(tc) => tc,
            Err(TcParseError::Empty) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match tc_processor::exec(&ctx, &tc) {
            Ok(r) => println!("{}", r),
            Err(e) => error!("{}", e),
        }
    }

    // ---- SHUTDOWN ----

    if let Some(ref path) = history_path {
        if let Err(e) = rl.save_history(path) {
            warn!("Could not save the console history: {}", e);
        }
    }

    match ctx.dropper.status() {
        Ok(s) => info!(
            "Markers left: {} red, {} black",
            s.red_slots.len(),
            s.black_slots.len()
        ),
        Err(e) => warn!("{}", e),
    }

    info!("Exiting");

    session.exit();

    Ok(())
}
