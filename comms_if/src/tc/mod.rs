//! # Telecommand module
//!
//! Commands an operator can issue from the surface console. A single command line such as
//! `drop red` or `fwd 120 200` is parsed into a [`Tc`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use structopt::{clap::AppSettings, StructOpt};
use thiserror::Error;

// Internal
use crate::eqpt::dropper::MarkerColour;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction issued by the operator at the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StructOpt)]
#[structopt(name = "babyrov", no_version, global_settings = &[AppSettings::NoBinaryName])]
pub enum Tc {
    /// Drop the next marker of the given colour.
    #[structopt(name = "drop")]
    DropMarker {
        /// Colour of the marker to drop (red or black)
        colour: MarkerColour,
    },

    /// Rotate the marker dropper back to its home position.
    #[structopt(name = "home")]
    DropperHome,

    /// Show the markers remaining in the dropper and its committed angle.
    #[structopt(name = "status")]
    DropperStatus,

    /// Drive the BabyROV forward while unreeling the winch.
    #[structopt(name = "fwd")]
    Forward {
        /// Winch PWM speed, 0-255
        winch_speed: u8,

        /// Thruster speed, 0-255
        thruster_speed: u8,
    },

    /// Stop the thruster and reel the BabyROV in.
    #[structopt(name = "back")]
    Backward {
        /// Winch PWM speed, 0-255
        winch_speed: u8,
    },

    /// Stop both the winch and the thruster.
    #[structopt(name = "stop")]
    Stop,

    /// Take a temperature reading.
    #[structopt(name = "temp")]
    ReadTemp,

    /// Take a pH reading.
    #[structopt(name = "ph")]
    ReadPh,

    /// Program the pH sensor ADC read mode, needed once after power on.
    #[structopt(name = "phsetup")]
    SetupPh,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("No command given")]
    Empty,

    #[error("{0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a TC from a single console line.
    pub fn parse(line: &str) -> Result<Self, TcParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.is_empty() {
            return Err(TcParseError::Empty);
        }

        Tc::from_iter_safe(words).map_err(|e| TcParseError::Invalid(e.message))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
