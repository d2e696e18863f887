//! # Dropper Session
//!
//! Owns the marker dropper and the channel to the vehicle for the duration of a control session,
//! and runs the request, actuate, confirm sequence of each drop as one critical section.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::{fmt, sync::Mutex};

use comms_if::eqpt::{
    dropper::{ActuationResult, MarkerColour},
    shell::ShellResponse,
};

use crate::{
    marker_dropper::{
        DropRequest, DropTarget, DropperError, DropperStatus, MarkerDropper, RequestOutcome,
    },
    shell_client::{RemoteExec, ShellClientError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The dropper and vehicle link of one control session.
///
/// Every operation holds the session lock from the request until the confirmation, so concurrent
/// callers can never replace each other's staged request.
pub struct DropperSession<E: RemoteExec> {
    inner: Mutex<Inner<E>>,
}

struct Inner<E> {
    dropper: MarkerDropper,

    exec: E,

    num_commits: u64,
}

/// A committed dropper movement, saved into the session directory.
#[derive(Debug, Serialize)]
pub struct DropJournalEntry {
    pub timestamp: DateTime<Utc>,
    pub token: u64,
    pub target: DropTarget,
    pub angle_deg: f64,
    pub pulse_us: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What happened to a drop or home request.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The marker was dropped and the dropper state advanced.
    Dropped {
        colour: MarkerColour,
        slot: i32,
        angle_deg: f64,
        pulse_us: u32,
    },

    /// The dropper returned to its home position.
    Homed { angle_deg: f64, pulse_us: u32 },

    /// No marker of this colour is left, nothing was sent to the vehicle.
    Exhausted { colour: MarkerColour },

    /// The vehicle did not confirm the movement, the dropper state is unchanged.
    NotConfirmed { result: ActuationResult },
}

#[derive(thiserror::Error, Debug)]
pub enum DropSessionError {
    #[error("Dropper error: {0}")]
    Dropper(#[from] DropperError),

    #[error("Could not reach the vehicle: {0}")]
    Shell(#[from] ShellClientError),

    #[error("The dropper session lock was poisoned by a panic")]
    LockPoisoned,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<E: RemoteExec> DropperSession<E> {
    pub fn new(dropper: MarkerDropper, exec: E) -> Self {
        Self {
            inner: Mutex::new(Inner {
                dropper,
                exec,
                num_commits: 0,
            }),
        }
    }

    /// Rotate the dropper back to its home position.
    pub fn go_to_start(&self) -> Result<DropOutcome, DropSessionError> {
        let mut inner = self.lock()?;

        let request = inner.dropper.go_to_start()?;

        inner.actuate(request)
    }

    /// Drop the next marker of the given colour.
    pub fn drop_marker(&self, colour: MarkerColour) -> Result<DropOutcome, DropSessionError> {
        let mut inner = self.lock()?;

        match inner.dropper.request_drop(colour)? {
            RequestOutcome::Staged(request) => inner.actuate(request),
            RequestOutcome::Exhausted { colour, .. } => Ok(DropOutcome::Exhausted { colour }),
        }
    }

    /// Run an arbitrary command on the vehicle.
    ///
    /// Shares the session lock so it can never run in the middle of a drop.
    pub fn run(&self, cmd: &str) -> Result<ShellResponse, DropSessionError> {
        let mut inner = self.lock()?;

        Ok(inner.exec.exec(cmd)?)
    }

    pub fn status(&self) -> Result<DropperStatus, DropSessionError> {
        Ok(self.lock()?.dropper.status())
    }

    /// End the session, returning the dropper and the channel.
    pub fn into_parts(self) -> Result<(MarkerDropper, E), DropSessionError> {
        let inner = self
            .inner
            .into_inner()
            .map_err(|_| DropSessionError::LockPoisoned)?;

        Ok((inner.dropper, inner.exec))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner<E>>, DropSessionError> {
        self.inner.lock().map_err(|_| DropSessionError::LockPoisoned)
    }
}

impl<E: RemoteExec> Inner<E> {
    /// Send the staged request to the vehicle and confirm it with the result.
    ///
    /// The request is abandoned unless the vehicle positively confirms it.
    fn actuate(&mut self, request: DropRequest) -> Result<DropOutcome, DropSessionError> {
        let cmd = request.demand.to_pigs_cmd();

        debug!("Actuating #{}: {}", request.token, cmd);

        let result = match self.exec.exec(&cmd) {
            Ok(resp) => resp.actuation_result(),
            Err(ShellClientError::Timeout) => ActuationResult::Timeout,
            Err(e) => {
                self.dropper.abandon();
                return Err(e.into());
            }
        };

        if !self.dropper.confirm_drop(&request, &result)? {
            self.dropper.abandon();
            return Ok(DropOutcome::NotConfirmed { result });
        }

        self.num_commits += 1;
        util::session::save(
            format!("dropper/move_{:03}.json", self.num_commits),
            DropJournalEntry {
                timestamp: Utc::now(),
                token: request.token,
                target: request.target,
                angle_deg: request.target_angle_deg,
                pulse_us: request.demand.pulse_us,
            },
        );

        Ok(match request.target {
            DropTarget::Marker { colour, slot } => DropOutcome::Dropped {
                colour,
                slot,
                angle_deg: request.target_angle_deg,
                pulse_us: request.demand.pulse_us,
            },
            DropTarget::Home => DropOutcome::Homed {
                angle_deg: request.target_angle_deg,
                pulse_us: request.demand.pulse_us,
            },
        })
    }
}

impl fmt::Display for DropOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropOutcome::Dropped {
                colour,
                slot,
                angle_deg,
                pulse_us,
            } => write!(
                f,
                "Dropped {} marker from slot {} ({:.1} deg, {} us)",
                colour, slot, angle_deg, pulse_us
            ),
            DropOutcome::Homed { angle_deg, pulse_us } => {
                write!(f, "Dropper at home ({:.1} deg, {} us)", angle_deg, pulse_us)
            }
            DropOutcome::Exhausted { colour } => write!(f, "No more {} markers!", colour),
            DropOutcome::NotConfirmed { result } => {
                write!(f, "Dropper did not move, vehicle reported {}", result)
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
