//! CLI tool to evaluate a sector's LOA rules against a flight scenario.
//!
//! Loads `<sector>.json` from the config directory, feeds every flight in
//! the scenario file through the engine and prints the resolved XFL /
//! detailed XFL / COP tag values.

use anyhow::{Context, Result};
use clap::Parser;
use loa_core::{ControllerSession, FlightSnapshot, LoaEngine, TagValue};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Evaluate LOA tag values for a scenario of flight snapshots
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding per-sector LOA config files
    #[arg(long, default_value = "loa_configs")]
    config_dir: PathBuf,

    /// Sector position id to load rules for
    #[arg(long)]
    sector: String,

    /// Scenario JSON file (controllers + flights with routes)
    #[arg(long)]
    scenario: PathBuf,
}

/// One scenario flight: a snapshot plus its extracted route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioFlight {
    #[serde(flatten)]
    flight: FlightSnapshot,
    #[serde(default)]
    route: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    #[serde(default)]
    controllers: Vec<ControllerSession>,
    flights: Vec<ScenarioFlight>,
}

fn label_or_dash(value: &TagValue) -> String {
    let label = if value.label.is_empty() {
        "-".to_string()
    } else {
        value.label.clone()
    };
    match value.color {
        Some(color) => format!("{label} ({color:?})"),
        None => label,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loa_core=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut engine = LoaEngine::new();
    engine
        .load_sector(&args.sector, &args.config_dir)
        .with_context(|| format!("loading LOA rules for sector {}", args.sector))?;
    tracing::info!(
        sector = %args.sector,
        rules = engine.rules().len(),
        "rules active"
    );

    let scenario_text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&scenario_text).context("parsing scenario file")?;

    println!(
        "{:<10} {:<8} {:<10} {:<18} {:<18} {}",
        "CALLSIGN", "RULE", "XFL", "XFL DETAILED", "COP", "CATEGORY"
    );
    let now = Instant::now();
    for entry in &scenario.flights {
        let controllers = scenario.controllers.clone();
        let route = entry.route.clone();
        let frame = engine.begin_frame(&entry.flight, move || controllers, move || route, now);

        let xfl = engine.resolve_xfl(&entry.flight, &frame);
        let xfl_detailed = engine.resolve_xfl_detailed(&entry.flight, &frame);
        let cop = engine.resolve_cop(&entry.flight, &frame);

        let (rule, category) = match frame.matched {
            Some(rule_ref) => (
                format!("#{}", rule_ref.index),
                format!("{:?}", rule_ref.category),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<10} {:<8} {:<10} {:<18} {:<18} {}",
            entry.flight.callsign,
            rule,
            label_or_dash(&xfl),
            label_or_dash(&xfl_detailed),
            label_or_dash(&cop),
            category
        );
    }

    Ok(())
}
