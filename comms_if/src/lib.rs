//! # Communications interface crate.
//!
//! Provides all common communications interfaces between the surface computer and the BabyROV.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Commands that can be issued from the surface console
pub mod tc;

/// Command and response definitions for equipment (the marker dropper and the remote shell)
pub mod eqpt;

/// Network module
pub mod net;
