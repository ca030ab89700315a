//! Per-flight coordination negotiation tracking.
//!
//! Two independent tracks per callsign: exit altitude and exit point. The
//! tracker only records transitions reported through the flight snapshot;
//! it never drives the negotiation itself.

use crate::models::CoordinationState;
use std::collections::HashMap;

/// Exit altitudes below this are treated as "no value under negotiation".
pub const MIN_COORDINATED_ALTITUDE_FT: i32 = 500;

/// Last observed negotiation values and states for one callsign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinationInfo {
    pub exit_altitude_ft: i32,
    pub exit_altitude_state: CoordinationState,
    pub exit_point: String,
    pub exit_point_state: CoordinationState,
}

/// Tracks in-flight XFL/COP negotiations so an already resolved negotiation
/// is not re-triggered. Entries are created lazily on the first observed
/// coordination event and removed only via [`CoordinationTracker::remove`].
#[derive(Default)]
pub struct CoordinationTracker {
    flights: HashMap<String, CoordinationInfo>,
}

impl CoordinationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one altitude-track observation into the tracker.
    ///
    /// A live request with a real altitude persists the value together with
    /// the observed role. A drop back to `None` while the reported altitude
    /// still equals the held one promotes the track to `ManualAccepted`.
    pub fn observe_altitude(&mut self, callsign: &str, altitude_ft: i32, live: CoordinationState) {
        if live.is_live_request() && altitude_ft >= MIN_COORDINATED_ALTITUDE_FT {
            let info = self.flights.entry(callsign.to_string()).or_default();
            info.exit_altitude_ft = altitude_ft;
            info.exit_altitude_state = live;
            return;
        }

        if live == CoordinationState::None {
            if let Some(info) = self.flights.get_mut(callsign) {
                if info.exit_altitude_state.is_live_request()
                    && info.exit_altitude_ft >= MIN_COORDINATED_ALTITUDE_FT
                    && info.exit_altitude_ft == altitude_ft
                {
                    info.exit_altitude_state = CoordinationState::ManualAccepted;
                }
            }
        }
    }

    /// Fold one point-track observation into the tracker; same shape as
    /// [`CoordinationTracker::observe_altitude`] with "non-empty name" as the
    /// non-trivial-value test.
    pub fn observe_point(&mut self, callsign: &str, point: &str, live: CoordinationState) {
        if live.is_live_request() && !point.is_empty() {
            let info = self.flights.entry(callsign.to_string()).or_default();
            info.exit_point = point.to_string();
            info.exit_point_state = live;
            return;
        }

        if live == CoordinationState::None {
            if let Some(info) = self.flights.get_mut(callsign) {
                if info.exit_point_state.is_live_request()
                    && !info.exit_point.is_empty()
                    && info.exit_point == point
                {
                    info.exit_point_state = CoordinationState::ManualAccepted;
                }
            }
        }
    }

    /// Record a host-reported altitude-track transition as-is, whether or
    /// not a tag for the flight is currently rendered. The reported state is
    /// stored verbatim, including `Refused` and `ManualAccepted`.
    pub fn record_altitude(&mut self, callsign: &str, altitude_ft: i32, state: CoordinationState) {
        let info = self.flights.entry(callsign.to_string()).or_default();
        info.exit_altitude_ft = altitude_ft;
        info.exit_altitude_state = state;
    }

    /// Record a host-reported point-track transition as-is.
    pub fn record_point(&mut self, callsign: &str, point: &str, state: CoordinationState) {
        let info = self.flights.entry(callsign.to_string()).or_default();
        info.exit_point = point.to_string();
        info.exit_point_state = state;
    }

    pub fn get(&self, callsign: &str) -> Option<&CoordinationInfo> {
        self.flights.get(callsign)
    }

    /// True once the altitude track reached `ManualAccepted` for this value.
    pub fn altitude_accepted(&self, callsign: &str, altitude_ft: i32) -> bool {
        self.get(callsign).is_some_and(|info| {
            info.exit_altitude_state == CoordinationState::ManualAccepted
                && info.exit_altitude_ft >= MIN_COORDINATED_ALTITUDE_FT
                && info.exit_altitude_ft == altitude_ft
        })
    }

    /// The accepted exit point, when the point track is terminal.
    pub fn accepted_point(&self, callsign: &str) -> Option<&str> {
        self.get(callsign).and_then(|info| {
            (info.exit_point_state == CoordinationState::ManualAccepted
                && !info.exit_point.is_empty())
            .then_some(info.exit_point.as_str())
        })
    }

    pub fn remove(&mut self, callsign: &str) {
        self.flights.remove(callsign);
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}
