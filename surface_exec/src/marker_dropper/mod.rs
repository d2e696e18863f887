//! Marker dropper module
//!
//! Sequences the drops of the rotating marker dropper. Drops are two-phase: a request stages the
//! angle the dropper must rotate to, and the dropper's committed state only advances once the
//! caller confirms that the rotation was actually executed on the vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MarkerDropper operation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DropperError {
    #[error("Invalid dropper configuration: {0}")]
    InvalidConfig(String),

    #[error("Drop protocol violated: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Misuse of the request/confirm protocol by the caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Request #{0} has already been confirmed")]
    AlreadyConfirmed(u64),

    #[error("Request #{token} is not the staged request (staged: {staged:?})")]
    NotStaged { token: u64, staged: Option<u64> },

    #[error("Request #{0} is still awaiting confirmation")]
    RequestPending(u64),
}
