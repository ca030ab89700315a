pub mod airport;
pub mod cache;
pub mod config;
pub mod coordination;
pub mod engine;
pub mod models;
pub mod resolvers;
pub mod rules;

pub use airport::AirportFilter;
pub use cache::{MatchCache, OnlineControllerCache, RouteCache, MATCH_TTL, ONLINE_TTL, ROUTE_TTL};
pub use config::{load_sector_config, parse_sector_config, sector_config_path, ConfigError, SectorConfig};
pub use coordination::{CoordinationInfo, CoordinationTracker, MIN_COORDINATED_ALTITUDE_FT};
pub use engine::{CoordinationChange, Frame, LoaEngine};
pub use models::{
    ControllerSession, CoordinationState, FlightPlanState, FlightSnapshot, TagColor, TagValue,
};
pub use rules::{LoaEntry, RuleCategory, RuleRef, RuleSet};
