//! Tag value resolvers: XFL, detailed XFL and COP.
//!
//! Each resolver folds the live coordination observation into the tracker,
//! renders an ongoing or accepted negotiation when there is one, and
//! otherwise falls through to a direct rule scan with direction-specific
//! altitude checks. The rule scans here deliberately do not apply the
//! tracking-controller gate of [`LoaEngine::match_flight`].

use crate::coordination::MIN_COORDINATED_ALTITUDE_FT;
use crate::engine::{fallback_entry_matches, waypoints_satisfied, Frame, LoaEngine};
use crate::models::{CoordinationState, FlightPlanState, FlightSnapshot, TagColor, TagValue};
use crate::rules::LoaEntry;

/// Coordinated exit altitudes render as a zero-padded flight level.
fn flight_level_label(altitude_ft: i32) -> String {
    format!("{:03}", altitude_ft / 100)
}

/// Rule-scan predicate shared by all three resolvers: online gate (when
/// required), origin/destination airports (empty list passes) and waypoints.
fn resolver_entry_matches(entry: &LoaEntry, flight: &FlightSnapshot, frame: &Frame) -> bool {
    if entry.require_next_sector_online
        && !entry
            .next_sectors
            .iter()
            .any(|sector| frame.online.contains(sector))
    {
        return false;
    }

    let origin_ok = entry.origins.is_empty() || entry.origin_filter().matches(&flight.origin);
    let destination_ok =
        entry.destinations.is_empty() || entry.destination_filter().matches(&flight.destination);

    origin_ok && destination_ok && waypoints_satisfied(entry, &frame.route)
}

fn live_altitude_value(flight: &FlightSnapshot) -> Option<TagValue> {
    if flight.exit_altitude_ft < MIN_COORDINATED_ALTITUDE_FT {
        return None;
    }
    let color = match flight.exit_altitude_state {
        CoordinationState::RequestedByMe => TagColor::RequestFromMe,
        CoordinationState::RequestedByOther => TagColor::RequestToMe,
        CoordinationState::Refused => TagColor::RequestRefused,
        _ => return None,
    };
    Some(TagValue::colored(
        flight_level_label(flight.exit_altitude_ft),
        color,
    ))
}

impl LoaEngine {
    /// XFL tag value for assumed IFR flights; blank otherwise.
    pub fn resolve_xfl(&mut self, flight: &FlightSnapshot, frame: &Frame) -> TagValue {
        if flight.state != FlightPlanState::Assumed || !flight.is_ifr() {
            return TagValue::blank();
        }

        self.coordination.observe_altitude(
            &flight.callsign,
            flight.exit_altitude_ft,
            flight.exit_altitude_state,
        );

        if let Some(value) = live_altitude_value(flight) {
            return value;
        }
        if flight.exit_altitude_state == CoordinationState::None
            && self
                .coordination
                .altitude_accepted(&flight.callsign, flight.exit_altitude_ft)
        {
            return TagValue::colored(
                flight_level_label(flight.exit_altitude_ft),
                TagColor::RequestAccepted,
            );
        }

        let scans: [(&[LoaEntry], bool); 4] = [
            (&self.rules.departure_loas, true),
            (&self.rules.destination_loas, false),
            (&self.rules.lor_departures, true),
            (&self.rules.lor_arrivals, false),
        ];
        for (entries, departure) in scans {
            for entry in entries {
                if !resolver_entry_matches(entry, flight, frame) {
                    continue;
                }
                let xfl_ft = entry.xfl_ft();
                let cleared = flight.cleared_altitude_ft;
                let final_alt = flight.final_altitude_ft;
                return if departure && cleared < xfl_ft && final_alt > xfl_ft {
                    TagValue::plain(entry.xfl.to_string())
                } else if !departure && cleared > xfl_ft {
                    TagValue::plain(entry.xfl.to_string())
                } else if cleared == xfl_ft || cleared == final_alt {
                    TagValue::blank()
                } else {
                    TagValue::plain((final_alt / 100).to_string())
                };
            }
        }

        if flight.cleared_altitude_ft == flight.final_altitude_ft {
            TagValue::blank()
        } else {
            TagValue::plain((flight.final_altitude_ft / 100).to_string())
        }
    }

    /// Detailed XFL tag value; renders the literal "XFL" placeholder when the
    /// flight is outside LOA handling or an arrival is still below the agreed
    /// level.
    pub fn resolve_xfl_detailed(&mut self, flight: &FlightSnapshot, frame: &Frame) -> TagValue {
        if !flight.state.is_loa_relevant() || !flight.is_ifr() {
            return TagValue::plain("XFL");
        }

        self.coordination.observe_altitude(
            &flight.callsign,
            flight.exit_altitude_ft,
            flight.exit_altitude_state,
        );

        if let Some(value) = live_altitude_value(flight) {
            return value;
        }
        if flight.exit_altitude_state == CoordinationState::None
            && self
                .coordination
                .altitude_accepted(&flight.callsign, flight.exit_altitude_ft)
        {
            return TagValue::colored(
                flight_level_label(flight.exit_altitude_ft),
                TagColor::RequestAccepted,
            );
        }

        let cleared = flight.cleared_altitude_ft;
        let final_label = || TagValue::plain((flight.final_altitude_ft / 100).to_string());

        let scans: [(&[LoaEntry], bool); 4] = [
            (&self.rules.departure_loas, true),
            (&self.rules.destination_loas, false),
            (&self.rules.lor_departures, true),
            (&self.rules.lor_arrivals, false),
        ];
        for (entries, departure) in scans {
            for entry in entries {
                if !resolver_entry_matches(entry, flight, frame) {
                    continue;
                }
                return if departure {
                    if cleared <= entry.xfl_ft() && flight.final_altitude_ft > entry.xfl_ft() {
                        TagValue::plain(entry.xfl.to_string())
                    } else {
                        final_label()
                    }
                } else if cleared < entry.xfl_ft() {
                    TagValue::plain("XFL")
                } else {
                    TagValue::plain(entry.xfl.to_string())
                };
            }
        }

        for entry in &self.rules.fallback_loas {
            if fallback_entry_matches(entry, flight, &frame.route) {
                return final_label();
            }
        }

        final_label()
    }

    /// COP tag value; "COPX" outside LOA handling or when no rule applies.
    pub fn resolve_cop(&mut self, flight: &FlightSnapshot, frame: &Frame) -> TagValue {
        if !flight.state.is_loa_relevant() || !flight.is_ifr() {
            return TagValue::plain("COPX");
        }

        self.coordination.observe_point(
            &flight.callsign,
            &flight.exit_point,
            flight.exit_point_state,
        );

        if let Some(point) = self.coordination.accepted_point(&flight.callsign) {
            return TagValue::colored(point, TagColor::RequestAccepted);
        }
        if !flight.exit_point.is_empty() {
            match flight.exit_point_state {
                CoordinationState::RequestedByMe => {
                    return TagValue::colored(&flight.exit_point, TagColor::RequestFromMe);
                }
                CoordinationState::RequestedByOther => {
                    return TagValue::colored(&flight.exit_point, TagColor::RequestToMe);
                }
                CoordinationState::Refused => {
                    return TagValue::colored("COPX", TagColor::RequestRefused);
                }
                _ => {}
            }
        }

        let cleared = flight.cleared_altitude_ft;
        let scans: [(&[LoaEntry], bool); 4] = [
            (&self.rules.departure_loas, true),
            (&self.rules.destination_loas, false),
            (&self.rules.lor_departures, true),
            (&self.rules.lor_arrivals, false),
        ];
        for (entries, departure) in scans {
            for entry in entries {
                if !resolver_entry_matches(entry, flight, frame) {
                    continue;
                }
                let level_ok = if departure {
                    cleared <= entry.xfl_ft()
                } else {
                    cleared >= entry.xfl_ft()
                };
                if level_ok {
                    return TagValue::plain(entry.cop_text.clone());
                }
                // First match with the wrong level ends this category.
                break;
            }
        }

        for entry in &self.rules.fallback_loas {
            if fallback_entry_matches(entry, flight, &frame.route) {
                return TagValue::plain(entry.cop_text.clone());
            }
        }

        TagValue::plain("COPX")
    }
}
