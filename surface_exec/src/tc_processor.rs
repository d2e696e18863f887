//! # Telecommand processor module
//!
//! The telecommand processor executes the commands typed into the surface console.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::fmt;

// Internal
use crate::{
    dropper_session::{DropOutcome, DropSessionError, DropperSession},
    marker_dropper::DropperStatus,
    params::ScriptParams,
    shell_client::RemoteExec,
};
use comms_if::{eqpt::dropper::ActuationResult, tc::Tc};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the processor needs to execute a TC.
pub struct SurfaceContext<E: RemoteExec> {
    pub dropper: DropperSession<E>,

    pub scripts: ScriptParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a successfully executed TC.
#[derive(Debug, Clone, PartialEq)]
pub enum TcResponse {
    Dropper(DropOutcome),
    DropperStatus(DropperStatus),

    /// A vehicle command ran, with its output
    VehicleOk(String),

    /// Temperature in degrees Celsius
    Temperature(f64),

    Ph(f64),
}

#[derive(Debug, thiserror::Error)]
pub enum TcExecError {
    #[error(transparent)]
    Session(#[from] DropSessionError),

    #[error("`{cmd}` failed on the vehicle: {result}")]
    CommandFailed { cmd: String, result: ActuationResult },

    #[error("`{cmd}` returned \"{output}\" which is not a valid reading")]
    InvalidReading { cmd: String, output: String },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
pub fn exec<E: RemoteExec>(ctx: &SurfaceContext<E>, tc: &Tc) -> Result<TcResponse, TcExecError> {
    debug!("Executing {:?}", tc);

    match tc {
        Tc::DropMarker { colour } => Ok(TcResponse::Dropper(ctx.dropper.drop_marker(*colour)?)),
        Tc::DropperHome => Ok(TcResponse::Dropper(ctx.dropper.go_to_start()?)),
        Tc::DropperStatus => Ok(TcResponse::DropperStatus(ctx.dropper.status()?)),
        Tc::Forward {
            winch_speed,
            thruster_speed,
        } => run_vehicle_cmd(
            ctx,
            &format!(
                "{} {} --forward {} {}",
                ctx.scripts.python, ctx.scripts.control, winch_speed, thruster_speed
            ),
        )
        .map(TcResponse::VehicleOk),
        Tc::Backward { winch_speed } => run_vehicle_cmd(
            ctx,
            &format!(
                "{} {} --backward {}",
                ctx.scripts.python, ctx.scripts.control, winch_speed
            ),
        )
        .map(TcResponse::VehicleOk),
        Tc::Stop => run_vehicle_cmd(
            ctx,
            &format!("{} {} --stop", ctx.scripts.python, ctx.scripts.control),
        )
        .map(TcResponse::VehicleOk),
        Tc::ReadTemp => read_sensor(
            ctx,
            &format!("{} {}", ctx.scripts.python, ctx.scripts.temp),
        )
        .map(TcResponse::Temperature),
        Tc::ReadPh => read_sensor(
            ctx,
            &format!("{} {} --read", ctx.scripts.python, ctx.scripts.ph),
        )
        .map(TcResponse::Ph),
        Tc::SetupPh => run_vehicle_cmd(
            ctx,
            &format!("{} {} --setup", ctx.scripts.python, ctx.scripts.ph),
        )
        .map(TcResponse::VehicleOk),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Run a command on the vehicle, returning its output if it succeeded.
fn run_vehicle_cmd<E: RemoteExec>(
    ctx: &SurfaceContext<E>,
    cmd: &str,
) -> Result<String, TcExecError> {
    let resp = ctx.dropper.run(cmd)?;

    match resp.actuation_result() {
        ActuationResult::Success => {
            info!("{}: {}", cmd, resp.stdout);
            Ok(resp.stdout)
        }
        result => {
            warn!("{} failed: {}", cmd, result);
            Err(TcExecError::CommandFailed {
                cmd: cmd.to_string(),
                result,
            })
        }
    }
}

/// Run a sensor script and parse the last line of its output as the reading.
fn read_sensor<E: RemoteExec>(ctx: &SurfaceContext<E>, cmd: &str) -> Result<f64, TcExecError> {
    let output = run_vehicle_cmd(ctx, cmd)?;

    output
        .lines()
        .last()
        .and_then(|l| l.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| TcExecError::InvalidReading {
            cmd: cmd.to_string(),
            output,
        })
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl fmt::Display for TcResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TcResponse::Dropper(outcome) => write!(f, "{}", outcome),
            TcResponse::DropperStatus(s) => {
                write!(
                    f,
                    "Red slots: {:?}\nBlack slots: {:?}\nDropper angle: {:.1} deg",
                    s.red_slots, s.black_slots, s.current_angle_deg
                )?;
                if let Some(target) = &s.staged {
                    write!(
                        f,
                        "\nAwaiting confirmation: {:?} at {:.1} deg",
                        target, s.pending_angle_deg
                    )?;
                }
                Ok(())
            }
            TcResponse::VehicleOk(out) if out.is_empty() => write!(f, "OK"),
            TcResponse::VehicleOk(out) => write!(f, "{}", out),
            TcResponse::Temperature(t) => write!(f, "Last Temperature Reading: {:.3} C", t),
            TcResponse::Ph(ph) => write!(f, "Last pH Reading: {:.2}", ph),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{marker_dropper::MarkerDropper, shell_client::scripted::ScriptedExec};
    use comms_if::eqpt::dropper::MarkerColour;

    fn context(exec: ScriptedExec) -> SurfaceContext<ScriptedExec> {
        SurfaceContext {
            dropper: DropperSession::new(
                MarkerDropper::new(200.0, 40.0, &[-2, -1], &[1, 2], 18).unwrap(),
                exec,
            ),
            scripts: ScriptParams {
                python: "python3".into(),
                control: "babyrov_control.py".into(),
                temp: "temp_reading.py".into(),
                ph: "ph_sensor.py".into(),
            },
        }
    }

    fn cmds(ctx: SurfaceContext<ScriptedExec>) -> Vec<String> {
        ctx.dropper.into_parts().unwrap().1.cmds
    }

    #[test]
    fn test_vehicle_cmds() {
        let ctx = context(ScriptedExec::default());

        for tc in [
            Tc::Forward {
                winch_speed: 100,
                thruster_speed: 255,
            },
            Tc::Backward { winch_speed: 80 },
            Tc::Stop,
        ]
        .iter()
        {
            assert_eq!(exec(&ctx, tc).unwrap(), TcResponse::VehicleOk(String::new()));
        }

        assert_eq!(
            cmds(ctx),
            vec![
                "python3 babyrov_control.py --forward 100 255",
                "python3 babyrov_control.py --backward 80",
                "python3 babyrov_control.py --stop",
            ]
        );
    }

    #[test]
    fn test_dropper_cmds() {
        let ctx = context(ScriptedExec::default());

        assert!(matches!(
            exec(
                &ctx,
                &Tc::DropMarker {
                    colour: MarkerColour::Red
                }
            )
            .unwrap(),
            TcResponse::Dropper(DropOutcome::Dropped { slot: -1, .. })
        ));

        match exec(&ctx, &Tc::DropperStatus).unwrap() {
            TcResponse::DropperStatus(s) => {
                assert_eq!(s.red_slots, vec![-2]);
                assert_eq!(s.current_angle_deg, 60.0);
            }
            r => panic!("Unexpected response {:?}", r),
        }

        assert_eq!(cmds(ctx), vec!["pigs s 18 1100"]);
    }

    #[test]
    fn test_readings() {
        let ctx = context(
            ScriptedExec::default()
                .ok("21.437")
                .ok("Success\n6.98")
                .ok("t=??"),
        );

        assert_eq!(
            exec(&ctx, &Tc::ReadTemp).unwrap(),
            TcResponse::Temperature(21.437)
        );
        assert_eq!(exec(&ctx, &Tc::ReadPh).unwrap(), TcResponse::Ph(6.98));
        assert!(matches!(
            exec(&ctx, &Tc::ReadTemp),
            Err(TcExecError::InvalidReading { .. })
        ));

        assert_eq!(
            cmds(ctx),
            vec![
                "python3 temp_reading.py",
                "python3 ph_sensor.py --read",
                "python3 temp_reading.py",
            ]
        );
    }

    #[test]
    fn test_ph_setup() {
        let ctx = context(ScriptedExec::default());

        assert_eq!(
            exec(&ctx, &Tc::SetupPh).unwrap(),
            TcResponse::VehicleOk(String::new())
        );
        assert_eq!(cmds(ctx), vec!["python3 ph_sensor.py --setup"]);
    }

    #[test]
    fn test_failed_vehicle_cmd() {
        let ctx = context(ScriptedExec::default().exit(1, "Traceback"));

        assert!(matches!(
            exec(&ctx, &Tc::Stop),
            Err(TcExecError::CommandFailed {
                result: ActuationResult::Failure(_),
                ..
            })
        ));
    }
}
