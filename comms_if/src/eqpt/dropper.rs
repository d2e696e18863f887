//! # Marker Dropper Equipment Commands
//!
//! The dropper is rotated by a hobby servo driven from a GPIO pin on the BabyROV's onboard
//! computer. Positions are demanded as pulse widths which the `pigpio` daemon generates.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Pulse width demanded at an angle of zero.
///
/// Units: microseconds
pub const MIN_PULSE_US: u32 = 500;

/// Pulse width demanded at the full angular range of the servo.
///
/// Units: microseconds
pub const MAX_PULSE_US: u32 = 2500;

/// GPIO pin the dropper servo is wired to on the BabyROV.
pub const DEFAULT_SERVO_PIN: u8 = 18;

/// Angular range of the dropper servo.
///
/// Units: degrees
pub const DEFAULT_ANGULAR_RANGE_DEG: f64 = 270.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A demand for the servo to hold a particular pulse width.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServoDemand {
    /// The GPIO pin of the servo
    pub pin: u8,

    /// Width of the pulse to send to the servo.
    ///
    /// Units: microseconds
    pub pulse_us: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The two colours of marker carried by the dropper.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColour {
    Red,
    Black,
}

/// Outcome of physically executing a demand, as reported by the actuation channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ActuationResult {
    /// The demand was executed and the executing command reported success.
    Success,

    /// The demand was delivered but the vehicle reported a failure.
    Failure(String),

    /// No answer was received from the vehicle in time, the demand may or may not have been
    /// executed.
    Timeout,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoDemand {
    /// Build the demand which rotates the servo on `pin` to `angle_deg`.
    ///
    /// The pulse width is mapped linearly from `[0, angular_range_deg]` onto
    /// `[MIN_PULSE_US, MAX_PULSE_US]` and rounded to the nearest microsecond. Angles outside the
    /// range of the servo are clamped to the ends of the pulse envelope.
    ///
    /// `angular_range_deg` must be finite and positive.
    pub fn from_angle(pin: u8, angle_deg: f64, angular_range_deg: f64) -> Self {
        debug_assert!(
            angular_range_deg.is_finite() && angular_range_deg > 0.0,
            "servo angular range must be positive, found {}",
            angular_range_deg
        );

        let time_range = (MAX_PULSE_US - MIN_PULSE_US) as f64;
        let pulse = MIN_PULSE_US as f64 + (angle_deg / angular_range_deg) * time_range;

        Self {
            pin,
            pulse_us: pulse
                .round()
                .clamp(MIN_PULSE_US as f64, MAX_PULSE_US as f64) as u32,
        }
    }

    /// Render the demand as a `pigs` command line for the pigpio daemon.
    pub fn to_pigs_cmd(&self) -> String {
        format!("pigs s {} {}", self.pin, self.pulse_us)
    }
}

impl MarkerColour {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerColour::Red => "red",
            MarkerColour::Black => "black",
        }
    }
}

impl fmt::Display for MarkerColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkerColour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(MarkerColour::Red),
            "black" | "b" => Ok(MarkerColour::Black),
            _ => Err(format!("\"{}\" is not a marker colour (expected red or black)", s)),
        }
    }
}

impl ActuationResult {
    /// Returns `true` only if the actuation was positively confirmed.
    pub fn is_success(&self) -> bool {
        matches!(self, ActuationResult::Success)
    }
}

impl fmt::Display for ActuationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuationResult::Success => write!(f, "success"),
            ActuationResult::Failure(reason) => write!(f, "failure ({})", reason),
            ActuationResult::Timeout => write!(f, "timeout"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pulse_boundaries() {
        assert_eq!(ServoDemand::from_angle(18, 0.0, 270.0).pulse_us, 500);
        assert_eq!(ServoDemand::from_angle(18, 270.0, 270.0).pulse_us, 2500);
        assert_eq!(ServoDemand::from_angle(18, 135.0, 270.0).pulse_us, 1500);
        assert_eq!(ServoDemand::from_angle(18, 60.0, 200.0).pulse_us, 1100);
        assert_eq!(ServoDemand::from_angle(18, 20.0, 200.0).pulse_us, 700);
    }

    #[test]
    fn test_pulse_rounding_and_clamping() {
        // 500 + (1/270)*2000 = 507.41
        assert_eq!(ServoDemand::from_angle(18, 1.0, 270.0).pulse_us, 507);
        // 500 + (2/270)*2000 = 514.81
        assert_eq!(ServoDemand::from_angle(18, 2.0, 270.0).pulse_us, 515);

        assert_eq!(ServoDemand::from_angle(18, -40.0, 270.0).pulse_us, MIN_PULSE_US);
        assert_eq!(ServoDemand::from_angle(18, 400.0, 270.0).pulse_us, MAX_PULSE_US);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "servo angular range must be positive")]
    fn test_zero_range_rejected() {
        ServoDemand::from_angle(18, 60.0, 0.0);
    }

    #[test]
    fn test_pigs_cmd() {
        let dem = ServoDemand::from_angle(18, 60.0, 200.0);
        assert_eq!(dem.to_pigs_cmd(), "pigs s 18 1100");
    }

    #[test]
    fn test_colour_parse() {
        assert_eq!("red".parse::<MarkerColour>(), Ok(MarkerColour::Red));
        assert_eq!("BLACK".parse::<MarkerColour>(), Ok(MarkerColour::Black));
        assert_eq!("b".parse::<MarkerColour>(), Ok(MarkerColour::Black));
        assert!("green".parse::<MarkerColour>().is_err());
    }
}
