//! Implementations for the MarkerDropper state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// Internal
use super::{DropperError, Params, ProtocolError};
use comms_if::eqpt::dropper::{ActuationResult, MarkerColour, ServoDemand};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Marker dropper state.
///
/// Red markers are dropped from the highest remaining slot downwards and black markers from the
/// lowest remaining slot upwards, as the two colours are loaded at opposite ends of the dropper.
///
/// The dropper is a single-owner state machine. Between a request and its confirmation no other
/// request may be made by another caller, otherwise the first request is replaced. Callers that
/// share a dropper must serialise the whole request, actuate, confirm sequence (see
/// [`crate::dropper_session::DropperSession`]).
#[derive(Debug)]
pub struct MarkerDropper {
    angular_range_deg: f64,

    spacing_deg: f64,

    servo_pin: u8,

    strict: bool,

    /// Remaining red slots, sorted ascending
    red_slots: Vec<i32>,

    /// Remaining black slots, sorted ascending
    black_slots: Vec<i32>,

    /// Angle of the home position, half the angular range.
    home_offset_deg: f64,

    /// Last angle the dropper is known to have reached.
    current_angle_deg: f64,

    /// Angle of the most recent request.
    pending_angle_deg: f64,

    /// The request awaiting confirmation, if any.
    staged: Option<DropRequest>,

    /// Token of the last confirmed request.
    last_confirmed: Option<u64>,

    next_token: u64,
}

/// A staged request which must be handed back to [`MarkerDropper::confirm_drop`] once the demand
/// has been executed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropRequest {
    /// Identifies this request within its dropper.
    pub token: u64,

    /// What this request will achieve once confirmed.
    pub target: DropTarget,

    /// Angle the dropper must be rotated to.
    ///
    /// Units: degrees
    pub target_angle_deg: f64,

    /// The servo demand achieving `target_angle_deg`.
    pub demand: ServoDemand,
}

/// Result of asking for a marker to be dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome {
    /// A marker was available and its drop has been staged.
    Staged(DropRequest),

    /// No marker of this colour remains. The demand holds the dropper at its committed angle.
    Exhausted {
        colour: MarkerColour,
        demand: ServoDemand,
    },
}

/// Destination of a staged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropTarget {
    /// Drop the marker in the given slot.
    Marker { colour: MarkerColour, slot: i32 },

    /// Return to the home position.
    Home,
}

/// Snapshot of the dropper state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropperStatus {
    pub red_slots: Vec<i32>,
    pub black_slots: Vec<i32>,
    pub current_angle_deg: f64,
    pub pending_angle_deg: f64,
    pub staged: Option<DropTarget>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MarkerDropper {
    /// Create a new dropper.
    ///
    /// The slot lists are copied into the dropper and sorted, duplicate slots are removed. The
    /// dropper starts at its home position with no request staged.
    pub fn new(
        angular_range_deg: f64,
        spacing_deg: f64,
        red_slots: &[i32],
        black_slots: &[i32],
        servo_pin: u8,
    ) -> Result<Self, DropperError> {
        if !angular_range_deg.is_finite() || angular_range_deg <= 0.0 {
            return Err(DropperError::InvalidConfig(format!(
                "angular range must be positive, found {}",
                angular_range_deg
            )));
        }
        if !spacing_deg.is_finite() || spacing_deg <= 0.0 {
            return Err(DropperError::InvalidConfig(format!(
                "slot spacing must be positive, found {}",
                spacing_deg
            )));
        }

        let home_offset_deg = angular_range_deg / 2.0;

        let dropper = Self {
            angular_range_deg,
            spacing_deg,
            servo_pin,
            strict: false,
            red_slots: sorted_slots(MarkerColour::Red, red_slots),
            black_slots: sorted_slots(MarkerColour::Black, black_slots),
            home_offset_deg,
            current_angle_deg: home_offset_deg,
            pending_angle_deg: home_offset_deg,
            staged: None,
            last_confirmed: None,
            next_token: 0,
        };

        for (colour, slots) in [
            (MarkerColour::Red, &dropper.red_slots),
            (MarkerColour::Black, &dropper.black_slots),
        ]
        .iter()
        {
            for &slot in slots.iter() {
                let angle = dropper.slot_angle_deg(slot);
                if angle < 0.0 || angle > angular_range_deg {
                    warn!(
                        "{} slot {} is at {:.1} deg, outside the servo range, it will not be \
                         reachable",
                        colour, slot, angle
                    );
                }
            }
        }

        Ok(dropper)
    }

    /// Create a new dropper from its parameters.
    pub fn from_params(params: &Params) -> Result<Self, DropperError> {
        Ok(Self::new(
            params.angular_range_deg,
            params.spacing_deg,
            &params.red_slots,
            &params.black_slots,
            params.servo_pin,
        )?
        .strict(params.strict))
    }

    /// Set whether a new request is rejected while an earlier one awaits confirmation.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Stage a return to the home position.
    ///
    /// The marker slots are not consulted.
    pub fn go_to_start(&mut self) -> Result<DropRequest, DropperError> {
        let request = self.stage(DropTarget::Home, self.home_offset_deg)?;

        debug!(
            "Staged #{} home at {:.1} deg ({} us)",
            request.token, request.target_angle_deg, request.demand.pulse_us
        );

        Ok(request)
    }

    /// Stage the drop of the next marker of the given colour.
    ///
    /// If no marker of that colour remains nothing is staged and the returned demand holds the
    /// dropper at its committed angle. The slots are only updated by [`Self::confirm_drop`].
    pub fn request_drop(&mut self, colour: MarkerColour) -> Result<RequestOutcome, DropperError> {
        let candidate = match colour {
            MarkerColour::Red => self.red_slots.last(),
            MarkerColour::Black => self.black_slots.first(),
        }
        .copied();

        let slot = match candidate {
            Some(s) => s,
            None => {
                info!("No more {} markers!", colour);
                return Ok(RequestOutcome::Exhausted {
                    colour,
                    demand: self.demand_for(self.current_angle_deg),
                });
            }
        };

        let request = self.stage(DropTarget::Marker { colour, slot }, self.slot_angle_deg(slot))?;

        debug!(
            "Staged #{} {} slot {} at {:.1} deg ({} us)",
            request.token, colour, slot, request.target_angle_deg, request.demand.pulse_us
        );

        Ok(RequestOutcome::Staged(request))
    }

    /// Confirm a staged request using the result of its actuation.
    ///
    /// Committed state only advances when `result` is a success, in which case `Ok(true)` is
    /// returned. For any other result `Ok(false)` is returned and the request stays staged so it
    /// can be retried.
    ///
    /// Confirming a request that is not the staged one, including confirming the same request
    /// twice, is a protocol error and leaves the dropper untouched.
    pub fn confirm_drop(
        &mut self,
        request: &DropRequest,
        result: &ActuationResult,
    ) -> Result<bool, DropperError> {
        let staged = match self.staged {
            Some(s) if s.token == request.token => s,
            staged => {
                if self.last_confirmed == Some(request.token) {
                    return Err(ProtocolError::AlreadyConfirmed(request.token).into());
                }
                return Err(ProtocolError::NotStaged {
                    token: request.token,
                    staged: staged.map(|s| s.token),
                }
                .into());
            }
        };

        if !result.is_success() {
            warn!(
                "Request #{} was not confirmed by the vehicle: {}",
                staged.token, result
            );
            return Ok(false);
        }

        self.current_angle_deg = self.pending_angle_deg;

        if let DropTarget::Marker { colour, slot } = staged.target {
            let slots = match colour {
                MarkerColour::Red => &mut self.red_slots,
                MarkerColour::Black => &mut self.black_slots,
            };
            if let Ok(idx) = slots.binary_search(&slot) {
                slots.remove(idx);
            }
            info!(
                "Dropped {} marker from slot {} ({} {} left)",
                colour,
                slot,
                slots.len(),
                colour
            );
        } else {
            info!("Dropper at home ({:.1} deg)", self.current_angle_deg);
        }

        self.staged = None;
        self.last_confirmed = Some(staged.token);

        Ok(true)
    }

    /// Forget the staged request without changing the committed state.
    ///
    /// Used when the actuation was abandoned, e.g. after losing the link to the vehicle.
    pub fn abandon(&mut self) -> Option<DropRequest> {
        let abandoned = self.staged.take();

        if let Some(r) = &abandoned {
            debug!("Abandoned request #{}", r.token);
            self.pending_angle_deg = self.current_angle_deg;
        }

        abandoned
    }

    /// Get a snapshot of the dropper state.
    pub fn status(&self) -> DropperStatus {
        DropperStatus {
            red_slots: self.red_slots.clone(),
            black_slots: self.black_slots.clone(),
            current_angle_deg: self.current_angle_deg,
            pending_angle_deg: self.pending_angle_deg,
            staged: self.staged.map(|s| s.target),
        }
    }

    pub fn remaining(&self, colour: MarkerColour) -> &[i32] {
        match colour {
            MarkerColour::Red => &self.red_slots,
            MarkerColour::Black => &self.black_slots,
        }
    }

    pub fn current_angle_deg(&self) -> f64 {
        self.current_angle_deg
    }

    pub fn pending_angle_deg(&self) -> f64 {
        self.pending_angle_deg
    }

    pub fn home_offset_deg(&self) -> f64 {
        self.home_offset_deg
    }

    pub fn staged(&self) -> Option<&DropRequest> {
        self.staged.as_ref()
    }

    /// Angle the dropper must be at to drop the marker in `slot`.
    fn slot_angle_deg(&self, slot: i32) -> f64 {
        slot as f64 * self.spacing_deg + self.home_offset_deg
    }

    fn demand_for(&self, angle_deg: f64) -> ServoDemand {
        ServoDemand::from_angle(self.servo_pin, angle_deg, self.angular_range_deg)
    }

    /// Replace any staged request with a new one.
    fn stage(&mut self, target: DropTarget, angle_deg: f64) -> Result<DropRequest, DropperError> {
        if let Some(prev) = &self.staged {
            if self.strict {
                return Err(ProtocolError::RequestPending(prev.token).into());
            }
            warn!(
                "Request #{} replaced before it was confirmed, it will not be committed",
                prev.token
            );
        }

        let request = DropRequest {
            token: self.next_token,
            target,
            target_angle_deg: angle_deg,
            demand: self.demand_for(angle_deg),
        };

        self.next_token += 1;
        self.pending_angle_deg = angle_deg;
        self.staged = Some(request);

        Ok(request)
    }
}

impl RequestOutcome {
    /// The demand to send to the vehicle.
    pub fn demand(&self) -> ServoDemand {
        match self {
            RequestOutcome::Staged(r) => r.demand,
            RequestOutcome::Exhausted { demand, .. } => *demand,
        }
    }

    /// Returns `true` if a marker was available.
    pub fn had_marker(&self) -> bool {
        matches!(self, RequestOutcome::Staged(_))
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn sorted_slots(colour: MarkerColour, slots: &[i32]) -> Vec<i32> {
    let mut sorted = slots.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.len() != slots.len() {
        warn!("Duplicate {} slots removed, {:?} remain", colour, sorted);
    }

    sorted
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const OK: ActuationResult = ActuationResult::Success;

    fn dropper() -> MarkerDropper {
        MarkerDropper::new(200.0, 40.0, &[-1, -2], &[2, 1], 18).unwrap()
    }

    fn staged(outcome: RequestOutcome) -> DropRequest {
        match outcome {
            RequestOutcome::Staged(r) => r,
            o => panic!("Expected a staged request, got {:?}", o),
        }
    }

    #[test]
    fn test_new() {
        let d = dropper();
        assert_eq!(d.remaining(MarkerColour::Red), &[-2, -1]);
        assert_eq!(d.remaining(MarkerColour::Black), &[1, 2]);
        assert_eq!(d.home_offset_deg(), 100.0);
        assert_eq!(d.current_angle_deg(), 100.0);
        assert_eq!(d.pending_angle_deg(), 100.0);
        assert!(d.staged().is_none());

        let d = MarkerDropper::new(270.0, 40.0, &[3, -1, 3], &[], 18).unwrap();
        assert_eq!(d.remaining(MarkerColour::Red), &[-1, 3]);

        assert!(matches!(
            MarkerDropper::new(0.0, 40.0, &[], &[], 18),
            Err(DropperError::InvalidConfig(_))
        ));
        assert!(matches!(
            MarkerDropper::new(270.0, -5.0, &[], &[], 18),
            Err(DropperError::InvalidConfig(_))
        ));
        assert!(matches!(
            MarkerDropper::new(f64::NAN, 40.0, &[], &[], 18),
            Err(DropperError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_slots_not_shared() {
        let slots = vec![1, 2, 3];
        let mut a = MarkerDropper::new(270.0, 40.0, &slots, &[], 18).unwrap();
        let b = MarkerDropper::new(270.0, 40.0, &slots, &[], 18).unwrap();

        let r = staged(a.request_drop(MarkerColour::Red).unwrap());
        a.confirm_drop(&r, &OK).unwrap();

        assert_eq!(a.remaining(MarkerColour::Red), &[1, 2]);
        assert_eq!(b.remaining(MarkerColour::Red), &[1, 2, 3]);
        assert_eq!(slots, vec![1, 2, 3]);
    }

    #[test]
    fn test_red_from_top_black_from_bottom() {
        let mut d = MarkerDropper::new(270.0, 10.0, &[-3, 5, 0, 2], &[4, -6, 1], 18).unwrap();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        assert_eq!(
            r.target,
            DropTarget::Marker {
                colour: MarkerColour::Red,
                slot: 5
            }
        );
        assert_eq!(r.target_angle_deg, 185.0);

        let b = staged(d.request_drop(MarkerColour::Black).unwrap());
        assert_eq!(
            b.target,
            DropTarget::Marker {
                colour: MarkerColour::Black,
                slot: -6
            }
        );
        assert_eq!(b.target_angle_deg, 75.0);
    }

    #[test]
    fn test_request_is_idempotent_until_confirmed() {
        let mut d = dropper();

        let first = staged(d.request_drop(MarkerColour::Black).unwrap());
        let second = staged(d.request_drop(MarkerColour::Black).unwrap());

        assert_eq!(first.target, second.target);
        assert_eq!(first.demand, second.demand);
        assert_ne!(first.token, second.token);
        assert_eq!(d.remaining(MarkerColour::Black), &[1, 2]);
        assert_eq!(d.current_angle_deg(), 100.0);
    }

    #[test]
    fn test_confirm() {
        let mut d = dropper();

        let r = staged(d.request_drop(MarkerColour::Black).unwrap());
        assert_eq!(d.pending_angle_deg(), 140.0);
        assert_eq!(d.current_angle_deg(), 100.0);

        assert_eq!(d.confirm_drop(&r, &OK), Ok(true));
        assert_eq!(d.remaining(MarkerColour::Black), &[2]);
        assert_eq!(d.remaining(MarkerColour::Red), &[-2, -1]);
        assert_eq!(d.current_angle_deg(), r.target_angle_deg);
        assert!(d.staged().is_none());
    }

    #[test]
    fn test_double_confirm_rejected() {
        let mut d = dropper();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        d.confirm_drop(&r, &OK).unwrap();

        assert_eq!(
            d.confirm_drop(&r, &OK),
            Err(DropperError::Protocol(ProtocolError::AlreadyConfirmed(
                r.token
            )))
        );
        assert_eq!(d.remaining(MarkerColour::Red), &[-2]);
        assert_eq!(d.current_angle_deg(), 60.0);
    }

    #[test]
    fn test_superseded_request_rejected() {
        let mut d = dropper();

        let red = staged(d.request_drop(MarkerColour::Red).unwrap());
        let black = staged(d.request_drop(MarkerColour::Black).unwrap());

        assert_eq!(
            d.confirm_drop(&red, &OK),
            Err(DropperError::Protocol(ProtocolError::NotStaged {
                token: red.token,
                staged: Some(black.token)
            }))
        );
        assert_eq!(d.remaining(MarkerColour::Red), &[-2, -1]);

        assert_eq!(d.confirm_drop(&black, &OK), Ok(true));
        assert_eq!(d.remaining(MarkerColour::Black), &[2]);
        assert_eq!(d.current_angle_deg(), 140.0);
    }

    #[test]
    fn test_unsuccessful_actuation_not_committed() {
        let mut d = dropper();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());

        assert_eq!(d.confirm_drop(&r, &ActuationResult::Timeout), Ok(false));
        assert_eq!(
            d.confirm_drop(&r, &ActuationResult::Failure("exit code 1".into())),
            Ok(false)
        );
        assert_eq!(d.remaining(MarkerColour::Red), &[-2, -1]);
        assert_eq!(d.current_angle_deg(), 100.0);

        // Still staged, so a later success commits it
        assert_eq!(d.confirm_drop(&r, &OK), Ok(true));
        assert_eq!(d.remaining(MarkerColour::Red), &[-2]);
    }

    #[test]
    fn test_abandon() {
        let mut d = dropper();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        assert_eq!(d.abandon(), Some(r));
        assert_eq!(d.pending_angle_deg(), 100.0);
        assert!(d.abandon().is_none());

        assert!(matches!(
            d.confirm_drop(&r, &OK),
            Err(DropperError::Protocol(ProtocolError::NotStaged { .. }))
        ));
        assert_eq!(d.remaining(MarkerColour::Red), &[-2, -1]);
    }

    #[test]
    fn test_strict_mode() {
        let mut d = dropper().strict(true);

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        assert_eq!(
            d.request_drop(MarkerColour::Black),
            Err(DropperError::Protocol(ProtocolError::RequestPending(r.token)))
        );
        assert_eq!(
            d.go_to_start(),
            Err(DropperError::Protocol(ProtocolError::RequestPending(r.token)))
        );
        assert_eq!(d.pending_angle_deg(), 60.0);

        d.confirm_drop(&r, &OK).unwrap();
        assert!(d.request_drop(MarkerColour::Black).is_ok());
    }

    #[test]
    fn test_go_to_start() {
        let mut d = dropper();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        d.confirm_drop(&r, &OK).unwrap();

        let home = d.go_to_start().unwrap();
        assert_eq!(home.target, DropTarget::Home);
        assert_eq!(home.target_angle_deg, 100.0);
        assert_eq!(home.demand.pulse_us, 1500);

        d.confirm_drop(&home, &OK).unwrap();
        assert_eq!(d.current_angle_deg(), 100.0);
        assert_eq!(d.remaining(MarkerColour::Red), &[-2]);
        assert_eq!(d.remaining(MarkerColour::Black), &[1, 2]);

        // Same answer with no markers at all
        let mut empty = MarkerDropper::new(270.0, 40.0, &[], &[], 18).unwrap();
        assert_eq!(empty.go_to_start().unwrap().target_angle_deg, 135.0);
    }

    #[test]
    fn test_exhausted_holds_committed_angle() {
        let mut d = MarkerDropper::new(200.0, 40.0, &[], &[2], 18).unwrap();

        let b = staged(d.request_drop(MarkerColour::Black).unwrap());
        d.confirm_drop(&b, &OK).unwrap();

        // Stage something else, then ask for a colour that has run out
        let home = d.go_to_start().unwrap();
        let outcome = d.request_drop(MarkerColour::Red).unwrap();

        assert!(!outcome.had_marker());
        assert_eq!(outcome.demand(), ServoDemand::from_angle(18, 180.0, 200.0));
        assert_eq!(d.staged(), Some(&home));
        assert_eq!(d.pending_angle_deg(), 100.0);
    }

    #[test]
    fn test_servo_range_boundaries() {
        let mut d = MarkerDropper::new(200.0, 50.0, &[2], &[-2], 7).unwrap();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        assert_eq!(r.target_angle_deg, 200.0);
        assert_eq!(r.demand, ServoDemand { pin: 7, pulse_us: 2500 });

        let b = staged(d.request_drop(MarkerColour::Black).unwrap());
        assert_eq!(b.target_angle_deg, 0.0);
        assert_eq!(b.demand, ServoDemand { pin: 7, pulse_us: 500 });
    }

    #[test]
    fn test_red_sequence() {
        let mut d = dropper();

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        assert_eq!(
            r.target,
            DropTarget::Marker {
                colour: MarkerColour::Red,
                slot: -1
            }
        );
        assert_eq!(r.target_angle_deg, 60.0);
        assert_eq!(r.demand.pulse_us, 1100);
        assert_eq!(r.demand.to_pigs_cmd(), "pigs s 18 1100");

        d.confirm_drop(&r, &OK).unwrap();
        assert_eq!(d.remaining(MarkerColour::Red), &[-2]);
        assert_eq!(d.current_angle_deg(), 60.0);

        let r = staged(d.request_drop(MarkerColour::Red).unwrap());
        assert_eq!(r.target_angle_deg, 20.0);
        assert_eq!(r.demand.pulse_us, 700);

        d.confirm_drop(&r, &OK).unwrap();
        assert!(d.remaining(MarkerColour::Red).is_empty());

        let outcome = d.request_drop(MarkerColour::Red).unwrap();
        assert!(!outcome.had_marker());
        assert_eq!(outcome.demand().pulse_us, 700);
        assert_eq!(d.current_angle_deg(), 20.0);
        assert_eq!(d.remaining(MarkerColour::Black), &[1, 2]);
    }
}
