//! # Surface library.
//!
//! Everything the surface console needs to operate the BabyROV, available to other crates in the
//! workspace.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Marker dropper - sequences the drops of the red and black markers
pub mod marker_dropper;

/// Dropper session - runs each dropper movement on the vehicle under the session lock
pub mod dropper_session;

/// Shell client - runs command lines on the vehicle
pub mod shell_client;

/// Telecommand processor - executes console commands
pub mod tc_processor;

/// Parameters of the surface executable
pub mod params;
