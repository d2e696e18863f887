//! Parameters structure for the MarkerDropper

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::dropper::{DEFAULT_ANGULAR_RANGE_DEG, DEFAULT_SERVO_PIN};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the marker dropper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// The full angular range of the dropper servo. The home position is the middle of this
    /// range.
    ///
    /// Units: degrees
    #[serde(default = "default_angular_range_deg")]
    pub angular_range_deg: f64,

    /// The angle between two adjacent marker slots.
    ///
    /// Units: degrees
    pub spacing_deg: f64,

    // ---- LOADOUT ----
    /// Slots loaded with red markers, relative to the home position.
    pub red_slots: Vec<i32>,

    /// Slots loaded with black markers, relative to the home position.
    pub black_slots: Vec<i32>,

    // ---- EQUIPMENT ----
    /// GPIO pin of the dropper servo
    #[serde(default = "default_servo_pin")]
    pub servo_pin: u8,

    // ---- BEHAVIOUR ----
    /// Reject a new request while an earlier one is still awaiting confirmation, instead of
    /// replacing it.
    #[serde(default)]
    pub strict: bool,

    /// Rotate the dropper to its home position when the console starts.
    #[serde(default)]
    pub home_on_start: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_angular_range_deg() -> f64 {
    DEFAULT_ANGULAR_RANGE_DEG
}

fn default_servo_pin() -> u8 {
    DEFAULT_SERVO_PIN
}
