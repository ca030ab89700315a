//! LOA rule entries and the per-sector rule set.

use crate::airport::AirportFilter;
use serde::{Deserialize, Serialize};

fn default_cop_text() -> String {
    "COPX".to_string()
}

/// One Letter-of-Agreement rule.
///
/// Within a category, list order is priority order: the first matching entry
/// wins. Entries are immutable once the owning [`RuleSet`] is installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaEntry {
    /// Origin airport codes, 2-4 characters; empty means unconstrained.
    pub origins: Vec<String>,
    /// Destination airport codes, 2-4 characters; empty means unconstrained.
    pub destinations: Vec<String>,
    /// Waypoints that must all appear in the flight's route (case-insensitive).
    pub waypoints: Vec<String>,
    /// Position ids of the receiving sector(s).
    pub next_sectors: Vec<String>,
    /// Coordination point label shown in the COP tag field.
    pub cop_text: String,
    /// When set, at least one next sector must be staffed for the rule to apply.
    pub require_next_sector_online: bool,
    /// Exit flight level in hundreds of feet (e.g. 140 = 14000 ft).
    pub xfl: i32,
    /// Fallback rules only: minimum cleared altitude in feet.
    pub min_altitude_ft: i32,

    #[serde(skip)]
    origin_filter: AirportFilter,
    #[serde(skip)]
    destination_filter: AirportFilter,
}

impl Default for LoaEntry {
    fn default() -> Self {
        Self {
            origins: Vec::new(),
            destinations: Vec::new(),
            waypoints: Vec::new(),
            next_sectors: Vec::new(),
            cop_text: default_cop_text(),
            require_next_sector_online: false,
            xfl: 0,
            min_altitude_ft: 0,
            origin_filter: AirportFilter::default(),
            destination_filter: AirportFilter::default(),
        }
    }
}

impl LoaEntry {
    /// Rebuild the derived airport filters from the raw lists. Must be called
    /// once after construction/deserialization and after any change to the
    /// airport lists; [`RuleSet::from_config`] does this for every entry.
    pub fn index(&mut self) {
        self.origin_filter = AirportFilter::from_codes(self.origins.iter().cloned());
        self.destination_filter = AirportFilter::from_codes(self.destinations.iter().cloned());
    }

    pub fn origin_filter(&self) -> &AirportFilter {
        &self.origin_filter
    }

    pub fn destination_filter(&self) -> &AirportFilter {
        &self.destination_filter
    }

    /// Exit flight level converted to feet.
    pub fn xfl_ft(&self) -> i32 {
        self.xfl * 100
    }
}

/// Rule category, in scan priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Destination,
    Departure,
    LorArrival,
    LorDeparture,
    Fallback,
}

impl RuleCategory {
    /// The primary categories scanned before fallback, in priority order.
    pub const PRIMARY: [RuleCategory; 4] = [
        RuleCategory::Destination,
        RuleCategory::Departure,
        RuleCategory::LorArrival,
        RuleCategory::LorDeparture,
    ];
}

/// Stable address of a rule entry within a [`RuleSet`].
///
/// Replaces raw entry references in caches: a `RuleRef` is only meaningful
/// against the rule-set generation it was resolved from, so a reload can
/// never leave a dangling pointer behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    pub category: RuleCategory,
    pub index: usize,
}

/// The five ordered rule collections for one sector.
///
/// Replaced wholesale on sector (re)load; never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub destination_loas: Vec<LoaEntry>,
    pub departure_loas: Vec<LoaEntry>,
    pub lor_arrivals: Vec<LoaEntry>,
    pub lor_departures: Vec<LoaEntry>,
    pub fallback_loas: Vec<LoaEntry>,
}

impl RuleSet {
    pub fn category(&self, category: RuleCategory) -> &[LoaEntry] {
        match category {
            RuleCategory::Destination => &self.destination_loas,
            RuleCategory::Departure => &self.departure_loas,
            RuleCategory::LorArrival => &self.lor_arrivals,
            RuleCategory::LorDeparture => &self.lor_departures,
            RuleCategory::Fallback => &self.fallback_loas,
        }
    }

    pub fn get(&self, rule_ref: RuleRef) -> Option<&LoaEntry> {
        self.category(rule_ref.category).get(rule_ref.index)
    }

    pub fn is_empty(&self) -> bool {
        self.destination_loas.is_empty()
            && self.departure_loas.is_empty()
            && self.lor_arrivals.is_empty()
            && self.lor_departures.is_empty()
            && self.fallback_loas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.destination_loas.len()
            + self.departure_loas.len()
            + self.lor_arrivals.len()
            + self.lor_departures.len()
            + self.fallback_loas.len()
    }
}
