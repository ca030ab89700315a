//! Time-windowed caches for routes, online controllers and match results.
//!
//! All state is owned by the [`crate::engine::LoaEngine`] and touched from a
//! single evaluation path per tick; lookups take an explicit `Instant` so the
//! expiry windows are testable without sleeping.

use crate::models::ControllerSession;
use crate::rules::RuleRef;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Validity window of a cached extracted route.
pub const ROUTE_TTL: Duration = Duration::from_secs(3);
/// Validity window of the online-controller snapshot.
pub const ONLINE_TTL: Duration = Duration::from_secs(5);
/// Validity window of a cached match result (positive or negative).
pub const MATCH_TTL: Duration = Duration::from_secs(5);

struct RouteEntry {
    points: Vec<String>,
    fetched_at: Instant,
}

/// Per-callsign cache of extracted route waypoint names.
#[derive(Default)]
pub struct RouteCache {
    entries: HashMap<String, RouteEntry>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached route for `callsign`, invoking `extract` once to
    /// refresh it on a miss or after [`ROUTE_TTL`].
    pub fn get_or_extract<F>(&mut self, callsign: &str, now: Instant, extract: F) -> &[String]
    where
        F: FnOnce() -> Vec<String>,
    {
        let stale = match self.entries.get(callsign) {
            Some(entry) => now.duration_since(entry.fetched_at) >= ROUTE_TTL,
            None => true,
        };
        if stale {
            self.entries.insert(
                callsign.to_string(),
                RouteEntry {
                    points: extract(),
                    fetched_at: now,
                },
            );
        }
        // Entry was inserted above if absent.
        &self.entries[callsign].points
    }

    pub fn remove(&mut self, callsign: &str) {
        self.entries.remove(callsign);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide snapshot of staffed surveillance positions.
///
/// Lazily refreshed every [`ONLINE_TTL`] from the host roster. Keeps a
/// content hash of the current set for downstream change detection.
#[derive(Default)]
pub struct OnlineControllerCache {
    positions: HashSet<String>,
    content_hash: u64,
    fetched_at: Option<Instant>,
}

impl OnlineControllerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the set of online position ids, refreshing from `roster` once
    /// the snapshot has expired. Only surveillance sessions with a non-empty
    /// position id are retained.
    pub fn get_online<F>(&mut self, now: Instant, roster: F) -> &HashSet<String>
    where
        F: FnOnce() -> Vec<ControllerSession>,
    {
        let stale = match self.fetched_at {
            Some(fetched_at) => now.duration_since(fetched_at) >= ONLINE_TTL,
            None => true,
        };
        if stale {
            self.positions = roster()
                .into_iter()
                .filter(|session| session.is_surveillance() && !session.position_id.is_empty())
                .map(|session| session.position_id)
                .collect();
            self.content_hash = hash_position_set(&self.positions);
            self.fetched_at = Some(now);
        }
        &self.positions
    }

    /// Hash of the most recent snapshot; changes whenever the staffed set does.
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }
}

fn hash_position_set(positions: &HashSet<String>) -> u64 {
    let mut sorted: Vec<&String> = positions.iter().collect();
    sorted.sort();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    sorted.hash(&mut hasher);
    hasher.finish()
}

struct MatchEntry {
    rule: Option<RuleRef>,
    generation: u64,
    fetched_at: Instant,
}

/// Per-callsign cache of match results, including cached misses.
///
/// Entries carry the rule-set generation they were resolved against; a
/// reload bumps the generation, so surviving entries can never be read
/// against the wrong rule set even if the cache is not cleared first.
#[derive(Default)]
pub struct MatchCache {
    entries: HashMap<String, MatchEntry>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A valid cached result, `Some(None)` being a cached "no match".
    pub fn get(&self, callsign: &str, now: Instant, generation: u64) -> Option<Option<RuleRef>> {
        let entry = self.entries.get(callsign)?;
        if entry.generation != generation || now.duration_since(entry.fetched_at) >= MATCH_TTL {
            return None;
        }
        Some(entry.rule)
    }

    pub fn insert(&mut self, callsign: &str, rule: Option<RuleRef>, now: Instant, generation: u64) {
        self.entries.insert(
            callsign.to_string(),
            MatchEntry {
                rule,
                generation,
                fetched_at: now,
            },
        );
    }

    pub fn remove(&mut self, callsign: &str) {
        self.entries.remove(callsign);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
