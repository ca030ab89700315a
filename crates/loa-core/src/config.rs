//! Sector LOA configuration loading.
//!
//! Each sector has one JSON file (`<position id>.json`) holding up to five
//! named rule lists. A failed load is reported and leaves whatever rule
//! state was previously installed untouched.

use crate::rules::{LoaEntry, RuleSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot open LOA config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Covers both non-JSON input and well-formed JSON with wrong field
    /// shapes; either way no partial rule collection is installed.
    #[error("malformed LOA config {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The on-disk document shape for one sector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectorConfig {
    pub destination_loas: Vec<LoaEntry>,
    pub departure_loas: Vec<LoaEntry>,
    pub lor_arrivals: Vec<LoaEntry>,
    pub lor_departures: Vec<LoaEntry>,
    pub fallback_loas: Vec<LoaEntry>,
}

impl RuleSet {
    /// Build an installed rule set from a parsed config, indexing the derived
    /// airport filters of every entry.
    pub fn from_config(config: SectorConfig) -> Self {
        let index_all = |mut entries: Vec<LoaEntry>| {
            for entry in &mut entries {
                entry.index();
            }
            entries
        };
        Self {
            destination_loas: index_all(config.destination_loas),
            departure_loas: index_all(config.departure_loas),
            lor_arrivals: index_all(config.lor_arrivals),
            lor_departures: index_all(config.lor_departures),
            fallback_loas: index_all(config.fallback_loas),
        }
    }
}

/// Parse a sector config document. The `path` is only used for error context.
pub fn parse_sector_config(json: &str, path: &Path) -> Result<RuleSet, ConfigError> {
    let config: SectorConfig =
        serde_json::from_str(json).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(RuleSet::from_config(config))
}

/// Load and parse the sector config file at `path`.
pub fn load_sector_config(path: &Path) -> Result<RuleSet, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sector_config(&json, path)
}

/// Path of the config file for `sector` inside `config_dir`.
pub fn sector_config_path(config_dir: &Path, sector: &str) -> PathBuf {
    config_dir.join(format!("{sector}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(json: &str) -> Result<RuleSet, ConfigError> {
        parse_sector_config(json, &PathBuf::from("test.json"))
    }

    #[test]
    fn test_parse_full_entry() {
        let rules = parse(
            r#"{
                "destinationLoas": [{
                    "origins": ["LOWW", "ED"],
                    "destinations": ["LKPR"],
                    "waypoints": ["BALTU"],
                    "nextSectors": ["PRG"],
                    "copText": "BALTU",
                    "requireNextSectorOnline": true,
                    "xfl": 240
                }],
                "fallbackLoas": [{"minAltitudeFt": 24500}]
            }"#,
        )
        .unwrap();

        assert_eq!(rules.destination_loas.len(), 1);
        let entry = &rules.destination_loas[0];
        assert_eq!(entry.cop_text, "BALTU");
        assert!(entry.require_next_sector_online);
        assert_eq!(entry.xfl, 240);
        // Derived filters are indexed as part of the load.
        assert!(entry.origin_filter().matches("EDDF"));
        assert_eq!(rules.fallback_loas[0].min_altitude_ft, 24500);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let rules = parse(r#"{"departureLoas": [{}]}"#).unwrap();
        let entry = &rules.departure_loas[0];
        assert_eq!(entry.cop_text, "COPX");
        assert_eq!(entry.xfl, 0);
        assert!(!entry.require_next_sector_online);
        assert!(rules.destination_loas.is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            parse("{not json"),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn test_wrong_field_shape_is_an_error() {
        // xfl as a string must fail the whole load, not install a partial set.
        let result = parse(r#"{"departureLoas": [{"xfl": "240"}]}"#);
        assert!(matches!(result, Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result = load_sector_config(Path::new("/nonexistent/XYZ.json"));
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }

    #[test]
    fn test_list_order_is_preserved() {
        let rules = parse(r#"{"departureLoas": [{"xfl": 100}, {"xfl": 200}]}"#).unwrap();
        assert_eq!(rules.departure_loas[0].xfl, 100);
        assert_eq!(rules.departure_loas[1].xfl, 200);
    }
}
