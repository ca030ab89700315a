//! Core data models for LOA matching and coordination.

use serde::{Deserialize, Serialize};

/// Host-reported flight plan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPlanState {
    /// Not relevant to the current sector
    NonConcerned,
    Notified,
    Coordinated,
    TransferToMeInitiated,
    TransferFromMeInitiated,
    Assumed,
    /// Duplicate/obsolete plan
    Redundant,
}

impl FlightPlanState {
    /// States in which LOA matching applies. Anything else triggers
    /// eager cache cleanup for the flight.
    pub fn is_loa_relevant(self) -> bool {
        matches!(
            self,
            FlightPlanState::Notified
                | FlightPlanState::Coordinated
                | FlightPlanState::TransferToMeInitiated
                | FlightPlanState::TransferFromMeInitiated
                | FlightPlanState::Assumed
        )
    }
}

/// Negotiation state of one coordination track (exit altitude or exit point).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationState {
    #[default]
    None,
    RequestedByMe,
    RequestedByOther,
    Refused,
    /// Terminal state reached when a requested value stabilizes after the
    /// live negotiation drops back to `None`.
    ManualAccepted,
}

impl CoordinationState {
    /// A negotiation that is currently in flight from either side.
    pub fn is_live_request(self) -> bool {
        matches!(
            self,
            CoordinationState::RequestedByMe | CoordinationState::RequestedByOther
        )
    }
}

/// Per-evaluation snapshot of a flight plan, built by the host each tick.
///
/// Altitudes are in feet; `exit_altitude_ft` carries the value under
/// negotiation (0 when none).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSnapshot {
    pub callsign: String,
    pub state: FlightPlanState,
    /// Flight plan type code; LOA matching only applies to "I" (IFR).
    #[serde(default)]
    pub plan_type: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub cleared_altitude_ft: i32,
    #[serde(default)]
    pub final_altitude_ft: i32,
    /// Position id of the controller currently tracking the flight.
    #[serde(default)]
    pub tracking_controller: String,
    #[serde(default)]
    pub exit_altitude_ft: i32,
    #[serde(default)]
    pub exit_altitude_state: CoordinationState,
    #[serde(default)]
    pub exit_point: String,
    #[serde(default)]
    pub exit_point_state: CoordinationState,
}

impl FlightSnapshot {
    pub fn is_ifr(&self) -> bool {
        self.plan_type.eq_ignore_ascii_case("I")
    }
}

/// One active controller session from the host roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSession {
    pub callsign: String,
    pub position_id: String,
}

impl ControllerSession {
    pub fn new(callsign: impl Into<String>, position_id: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
            position_id: position_id.into(),
        }
    }

    /// Sessions that count for "next sector online" checks: controller-staffed
    /// surveillance positions, identified by callsign convention.
    pub fn is_surveillance(&self) -> bool {
        self.callsign.contains("_CTR") || self.callsign.contains("_APP")
    }
}

/// Color selector attached to a rendered tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagColor {
    /// Ongoing request initiated by this sector
    RequestFromMe,
    /// Ongoing request initiated by the other sector
    RequestToMe,
    RequestRefused,
    RequestAccepted,
}

/// A resolved tag value: a short label plus an optional color selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagValue {
    pub label: String,
    pub color: Option<TagColor>,
}

impl TagValue {
    /// The host tag field holds at most 15 visible characters.
    pub const MAX_LABEL_LEN: usize = 15;

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn plain(label: impl Into<String>) -> Self {
        Self {
            label: truncate_label(label.into()),
            color: None,
        }
    }

    pub fn colored(label: impl Into<String>, color: TagColor) -> Self {
        Self {
            label: truncate_label(label.into()),
            color: Some(color),
        }
    }
}

fn truncate_label(mut label: String) -> String {
    if label.chars().count() > TagValue::MAX_LABEL_LEN {
        label = label.chars().take(TagValue::MAX_LABEL_LEN).collect();
    }
    label
}

/// Case-insensitive comparison used for waypoint and sector names.
pub fn equals_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
