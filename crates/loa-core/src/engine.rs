//! The LOA engine context: rule set, caches, coordination tracking and the
//! layered match algorithm.
//!
//! One owned [`LoaEngine`] replaces the process-wide containers of a typical
//! plugin host. All evaluation runs on a single logical path per tick; a
//! multi-threaded host wraps the engine in its own mutex.

use crate::cache::{MatchCache, OnlineControllerCache, RouteCache};
use crate::config::{self, ConfigError};
use crate::coordination::CoordinationTracker;
use crate::models::{equals_ignore_case, ControllerSession, CoordinationState, FlightSnapshot};
use crate::rules::{LoaEntry, RuleCategory, RuleRef, RuleSet};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

/// Everything the tag-value resolvers need for one evaluation tick, computed
/// once per flight and shared across the resolvers invoked in that tick.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Position ids of currently staffed surveillance sectors.
    pub online: HashSet<String>,
    /// Extracted route waypoint names.
    pub route: Vec<String>,
    /// The governing rule, if any.
    pub matched: Option<RuleRef>,
}

/// One host-reported coordination transition, delivered by the host whenever
/// a negotiation changes state, independently of tag rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationChange {
    /// Exit-altitude track, value in feet.
    ExitAltitude(i32),
    /// Exit-point track, value is the fix name.
    ExitPoint(String),
}

/// Owned engine state for one plugin instance.
#[derive(Default)]
pub struct LoaEngine {
    pub(crate) rules: RuleSet,
    generation: u64,
    loaded_sector: Option<String>,
    route_cache: RouteCache,
    online_cache: OnlineControllerCache,
    match_cache: MatchCache,
    pub(crate) coordination: CoordinationTracker,
    scan_count: u64,
}

impl LoaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Bumped on every rule-set install; cached match results from older
    /// generations are dead.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_sector(&self) -> Option<&str> {
        self.loaded_sector.as_deref()
    }

    pub fn coordination(&self) -> &CoordinationTracker {
        &self.coordination
    }

    pub fn coordination_mut(&mut self) -> &mut CoordinationTracker {
        &mut self.coordination
    }

    /// Number of full rule scans performed so far; cache hits do not count.
    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }

    /// Content hash of the last online-controller snapshot.
    pub fn online_content_hash(&self) -> u64 {
        self.online_cache.content_hash()
    }

    /// Atomically replace the rule set. Cached match results are cleared and
    /// the generation advances, so no stale rule reference survives the swap.
    pub fn install_rules(&mut self, rules: RuleSet) {
        self.rules = rules;
        self.generation += 1;
        self.match_cache.clear();
    }

    /// Load the LOA configuration for `sector` from `config_dir`, skipping
    /// the load when that sector is already active. On failure the previous
    /// rule state stays installed and the sector is marked not-yet-loaded so
    /// a later activation retries.
    pub fn load_sector(&mut self, sector: &str, config_dir: &Path) -> Result<(), ConfigError> {
        if self.loaded_sector.as_deref() == Some(sector) {
            return Ok(());
        }
        let path = config::sector_config_path(config_dir, sector);
        match config::load_sector_config(&path) {
            Ok(rules) => {
                tracing::info!(sector, rules = rules.len(), "LOA rules loaded");
                self.install_rules(rules);
                self.loaded_sector = Some(sector.to_string());
                Ok(())
            }
            Err(err) => {
                tracing::warn!(sector, error = %err, "LOA rule load failed");
                self.loaded_sector = None;
                Err(err)
            }
        }
    }

    /// Select the governing rule for `flight`, or `None`.
    ///
    /// Results (including misses) are cached per callsign for the match TTL.
    /// Categories are scanned in priority order; within a category the first
    /// matching entry wins.
    pub fn match_flight(
        &mut self,
        flight: &FlightSnapshot,
        online: &HashSet<String>,
        route: &[String],
        now: Instant,
    ) -> Option<RuleRef> {
        if !flight.state.is_loa_relevant() || !flight.is_ifr() {
            return None;
        }

        if let Some(cached) = self.match_cache.get(&flight.callsign, now, self.generation) {
            return cached;
        }

        self.scan_count += 1;

        let mut result = None;
        for category in RuleCategory::PRIMARY {
            let hit = self
                .rules
                .category(category)
                .iter()
                .position(|entry| primary_entry_matches(entry, flight, online, route));
            if let Some(index) = hit {
                result = Some(RuleRef { category, index });
                break;
            }
        }

        if result.is_none() {
            result = self
                .rules
                .fallback_loas
                .iter()
                .position(|entry| fallback_entry_matches(entry, flight, route))
                .map(|index| RuleRef {
                    category: RuleCategory::Fallback,
                    index,
                });
        }

        self.match_cache
            .insert(&flight.callsign, result, now, self.generation);
        result
    }

    /// Compute the per-tick evaluation frame for one flight: online set,
    /// route and match result, each at most once, handed to every resolver
    /// invoked within the tick.
    pub fn begin_frame<R, E>(
        &mut self,
        flight: &FlightSnapshot,
        roster: R,
        extract_route: E,
        now: Instant,
    ) -> Frame
    where
        R: FnOnce() -> Vec<ControllerSession>,
        E: FnOnce() -> Vec<String>,
    {
        let online = self.online_cache.get_online(now, roster).clone();
        let route = self
            .route_cache
            .get_or_extract(&flight.callsign, now, extract_route)
            .to_vec();
        let matched = self.match_flight(flight, &online, &route, now);
        Frame {
            online,
            route,
            matched,
        }
    }

    /// Resolve a frame's match result to the rule entry itself.
    pub fn matched_entry(&self, frame: &Frame) -> Option<&LoaEntry> {
        frame.matched.and_then(|rule_ref| self.rules.get(rule_ref))
    }

    /// React to a flight plan state transition: leaving the LOA-relevant
    /// region evicts the flight's cached route and match result. Re-entering
    /// relevance needs no action; the next evaluation recomputes from cold.
    pub fn handle_state_change(&mut self, flight: &FlightSnapshot) {
        if !flight.state.is_loa_relevant() {
            self.evict_caches(&flight.callsign);
        }
    }

    /// Record a host-reported coordination state change for a flight. The
    /// reported value and state land in the tracker as-is, so negotiations
    /// that start, get refused or get accepted between renders are known to
    /// the resolvers on their next call.
    pub fn handle_coordination_change(
        &mut self,
        callsign: &str,
        change: CoordinationChange,
        state: CoordinationState,
    ) {
        match change {
            CoordinationChange::ExitAltitude(altitude_ft) => {
                self.coordination.record_altitude(callsign, altitude_ft, state);
            }
            CoordinationChange::ExitPoint(point) => {
                self.coordination.record_point(callsign, &point, state);
            }
        }
    }

    /// Full per-flight cleanup on flight plan disposal.
    pub fn handle_flight_disposal(&mut self, callsign: &str) {
        self.evict_caches(callsign);
        self.coordination.remove(callsign);
    }

    fn evict_caches(&mut self, callsign: &str) {
        self.match_cache.remove(callsign);
        self.route_cache.remove(callsign);
    }
}

/// All listed waypoints present somewhere in the route, case-insensitively.
/// An empty waypoint list is vacuously satisfied.
pub(crate) fn waypoints_satisfied(entry: &LoaEntry, route: &[String]) -> bool {
    entry
        .waypoints
        .iter()
        .all(|wp| route.iter().any(|point| equals_ignore_case(point, wp)))
}

/// Match predicate for the four primary categories. The next-sector list is
/// both an optional online gate and, when non-empty, a hand-off target gate
/// against the tracking controller.
fn primary_entry_matches(
    entry: &LoaEntry,
    flight: &FlightSnapshot,
    online: &HashSet<String>,
    route: &[String],
) -> bool {
    if !entry.origins.is_empty() && !entry.origin_filter().matches(&flight.origin) {
        return false;
    }
    if !entry.destinations.is_empty() && !entry.destination_filter().matches(&flight.destination) {
        return false;
    }
    if entry.require_next_sector_online
        && !entry.next_sectors.is_empty()
        && !entry.next_sectors.iter().any(|sector| online.contains(sector))
    {
        return false;
    }

    let next_sector_match = entry.next_sectors.is_empty()
        || entry
            .next_sectors
            .iter()
            .any(|sector| equals_ignore_case(sector, &flight.tracking_controller));

    waypoints_satisfied(entry, route) && next_sector_match
}

/// Match predicate for fallback entries: minimum altitude, destination and
/// waypoints only. Origin and next-sector gates do not apply here.
pub(crate) fn fallback_entry_matches(
    entry: &LoaEntry,
    flight: &FlightSnapshot,
    route: &[String],
) -> bool {
    if flight.cleared_altitude_ft < entry.min_altitude_ft {
        return false;
    }
    if !entry.destinations.is_empty() && !entry.destination_filter().matches(&flight.destination) {
        return false;
    }
    waypoints_satisfied(entry, route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlightPlanState;

    fn ifr_flight(callsign: &str) -> FlightSnapshot {
        FlightSnapshot {
            callsign: callsign.into(),
            state: FlightPlanState::Assumed,
            plan_type: "I".into(),
            origin: "LOWW".into(),
            destination: "EDDM".into(),
            cleared_altitude_ft: 20000,
            final_altitude_ft: 36000,
            tracking_controller: String::new(),
            exit_altitude_ft: 0,
            exit_altitude_state: CoordinationState::None,
            exit_point: String::new(),
            exit_point_state: CoordinationState::None,
        }
    }

    fn entry(f: impl FnOnce(&mut LoaEntry)) -> LoaEntry {
        let mut entry = LoaEntry::default();
        f(&mut entry);
        entry.index();
        entry
    }

    fn engine_with(category: RuleCategory, entries: Vec<LoaEntry>) -> LoaEngine {
        let mut rules = RuleSet::default();
        match category {
            RuleCategory::Destination => rules.destination_loas = entries,
            RuleCategory::Departure => rules.departure_loas = entries,
            RuleCategory::LorArrival => rules.lor_arrivals = entries,
            RuleCategory::LorDeparture => rules.lor_departures = entries,
            RuleCategory::Fallback => rules.fallback_loas = entries,
        }
        let mut engine = LoaEngine::new();
        engine.install_rules(rules);
        engine
    }

    #[test]
    fn test_non_ifr_never_matches() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["EDDM".into()])],
        );
        let mut flight = ifr_flight("AUA123");
        flight.plan_type = "V".into();

        let result = engine.match_flight(&flight, &HashSet::new(), &[], Instant::now());
        assert!(result.is_none());
        // The gate runs before caching and scanning.
        assert_eq!(engine.scan_count(), 0);
    }

    #[test]
    fn test_irrelevant_state_never_matches() {
        let mut engine = engine_with(RuleCategory::Destination, vec![entry(|_| {})]);
        let mut flight = ifr_flight("AUA123");
        flight.state = FlightPlanState::NonConcerned;

        assert!(engine
            .match_flight(&flight, &HashSet::new(), &[], Instant::now())
            .is_none());
    }

    #[test]
    fn test_first_matching_entry_wins_within_category() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![
                entry(|e| e.destinations = vec!["EDDM".into()]),
                entry(|e| e.destinations = vec!["ED".into()]),
            ],
        );
        let flight = ifr_flight("AUA123");

        let result = engine.match_flight(&flight, &HashSet::new(), &[], Instant::now());
        assert_eq!(
            result,
            Some(RuleRef {
                category: RuleCategory::Destination,
                index: 0
            })
        );
    }

    #[test]
    fn test_category_priority_order() {
        let mut rules = RuleSet::default();
        rules.departure_loas = vec![entry(|e| e.origins = vec!["LOWW".into()])];
        rules.destination_loas = vec![entry(|e| e.destinations = vec!["EDDM".into()])];
        let mut engine = LoaEngine::new();
        engine.install_rules(rules);

        let flight = ifr_flight("AUA123");
        let result = engine.match_flight(&flight, &HashSet::new(), &[], Instant::now());
        assert_eq!(result.map(|r| r.category), Some(RuleCategory::Destination));
    }

    #[test]
    fn test_waypoints_must_all_be_present_case_insensitively() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| {
                e.waypoints = vec!["BALTU".into(), "LANUX".into()];
            })],
        );
        let flight = ifr_flight("AUA123");
        let now = Instant::now();

        let route = vec!["baltu".to_string(), "Lanux".to_string()];
        assert!(engine.match_flight(&flight, &HashSet::new(), &route, now).is_some());

        engine.handle_flight_disposal(&flight.callsign);
        let partial = vec!["BALTU".to_string()];
        assert!(engine
            .match_flight(&flight, &HashSet::new(), &partial, now)
            .is_none());
    }

    #[test]
    fn test_next_sector_doubles_as_handoff_target_gate() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.next_sectors = vec!["PRG".into()])],
        );
        let mut flight = ifr_flight("AUA123");
        let now = Instant::now();

        // No online gate set, but the tracking controller still has to be
        // one of the listed next sectors.
        assert!(engine.match_flight(&flight, &HashSet::new(), &[], now).is_none());

        engine.handle_flight_disposal(&flight.callsign);
        flight.tracking_controller = "prg".into();
        assert!(engine.match_flight(&flight, &HashSet::new(), &[], now).is_some());
    }

    #[test]
    fn test_online_gate_requires_staffed_next_sector() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| {
                e.next_sectors = vec!["PRG".into()];
                e.require_next_sector_online = true;
            })],
        );
        let mut flight = ifr_flight("AUA123");
        flight.tracking_controller = "PRG".into();
        let now = Instant::now();

        assert!(engine.match_flight(&flight, &HashSet::new(), &[], now).is_none());

        engine.handle_flight_disposal(&flight.callsign);
        let online: HashSet<String> = ["PRG".to_string()].into();
        assert!(engine.match_flight(&flight, &online, &[], now).is_some());
    }

    #[test]
    fn test_fallback_gates_on_minimum_altitude_only() {
        let mut engine = engine_with(
            RuleCategory::Fallback,
            vec![entry(|e| {
                e.min_altitude_ft = 24500;
                // Populated origin/next-sector fields are ignored on fallback.
                e.origins = vec!["LFPG".into()];
                e.next_sectors = vec!["ZZZ".into()];
            })],
        );
        let mut flight = ifr_flight("AUA123");
        let now = Instant::now();

        flight.cleared_altitude_ft = 23000;
        assert!(engine.match_flight(&flight, &HashSet::new(), &[], now).is_none());

        engine.handle_flight_disposal(&flight.callsign);
        flight.cleared_altitude_ft = 25000;
        let result = engine.match_flight(&flight, &HashSet::new(), &[], now);
        assert_eq!(result.map(|r| r.category), Some(RuleCategory::Fallback));
    }

    #[test]
    fn test_match_result_cached_within_window() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["EDDM".into()])],
        );
        let flight = ifr_flight("AUA123");
        let now = Instant::now();

        let first = engine.match_flight(&flight, &HashSet::new(), &[], now);
        let second = engine.match_flight(&flight, &HashSet::new(), &[], now);
        assert_eq!(first, second);
        assert_eq!(engine.scan_count(), 1);
    }

    #[test]
    fn test_negative_result_is_cached_too() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["LFPG".into()])],
        );
        let flight = ifr_flight("AUA123");
        let now = Instant::now();

        assert!(engine.match_flight(&flight, &HashSet::new(), &[], now).is_none());
        assert!(engine.match_flight(&flight, &HashSet::new(), &[], now).is_none());
        assert_eq!(engine.scan_count(), 1);
    }

    #[test]
    fn test_state_change_cleanup_forces_cold_miss() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["EDDM".into()])],
        );
        let mut flight = ifr_flight("AUA123");
        let now = Instant::now();

        engine.match_flight(&flight, &HashSet::new(), &[], now);
        assert_eq!(engine.scan_count(), 1);

        flight.state = FlightPlanState::NonConcerned;
        engine.handle_state_change(&flight);

        flight.state = FlightPlanState::Assumed;
        engine.match_flight(&flight, &HashSet::new(), &[], now);
        assert_eq!(engine.scan_count(), 2);
    }

    #[test]
    fn test_install_rules_invalidates_cached_matches() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["EDDM".into()])],
        );
        let flight = ifr_flight("AUA123");
        let now = Instant::now();

        let before = engine.match_flight(&flight, &HashSet::new(), &[], now);
        assert!(before.is_some());

        // Swap to a rule set where the flight no longer matches.
        let mut rules = RuleSet::default();
        rules.destination_loas = vec![entry(|e| e.destinations = vec!["LFPG".into()])];
        engine.install_rules(rules);

        let after = engine.match_flight(&flight, &HashSet::new(), &[], now);
        assert!(after.is_none());
        assert_eq!(engine.scan_count(), 2);
    }

    #[test]
    fn test_frame_computes_lookups_once() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["EDDM".into()])],
        );
        let flight = ifr_flight("AUA123");
        let now = Instant::now();

        let frame = engine.begin_frame(
            &flight,
            || vec![ControllerSession::new("LOVV_CTR", "B")],
            || vec!["BALTU".into()],
            now,
        );
        assert!(frame.online.contains("B"));
        assert_eq!(frame.route, ["BALTU".to_string()]);
        assert!(frame.matched.is_some());
        assert_eq!(engine.matched_entry(&frame).map(|e| e.xfl), Some(0));

        // The second frame within the TTL windows reuses every cached layer.
        let frame = engine.begin_frame(
            &flight,
            || panic!("roster re-queried"),
            || panic!("route re-extracted"),
            now,
        );
        assert!(frame.matched.is_some());
        assert_eq!(engine.scan_count(), 1);
    }

    #[test]
    fn test_failed_sector_load_keeps_prior_rules() {
        let mut engine = engine_with(
            RuleCategory::Destination,
            vec![entry(|e| e.destinations = vec!["EDDM".into()])],
        );
        let generation = engine.generation();

        let result = engine.load_sector("XYZ", Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(engine.rules().destination_loas.len(), 1);
        assert_eq!(engine.generation(), generation);
        assert!(engine.loaded_sector().is_none());
    }
}
