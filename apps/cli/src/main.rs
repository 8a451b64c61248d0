use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apex_io::{builtin_catalog, load_catalog, ReplayProvider};
use apex_telemetry_core::TelemetryProvider;
use apex_telemetry_openf1::{OpenF1Config, OpenF1Provider};
use model::SessionKind;
use strategy::{format_plan, predict_best_strategy, StrategyRequest};

/// Predicts a minimum-time tyre strategy for a race.
#[derive(Parser, Debug)]
#[command(name = "apex", version, about)]
struct Args {
    /// Track name (catalog key / circuit short name).
    track: String,

    /// Season year used when resolving a telemetry session.
    #[arg(long, default_value_t = 2025)]
    year: u16,

    /// Calibrate on a single driver's laps (name substring).
    #[arg(long)]
    driver: Option<String>,

    /// Rain probability percent, 0-100. Carried for future use.
    #[arg(long, default_value_t = 0.0, value_parser = parse_rain)]
    rain: f64,

    /// Session kind calibration draws from: race, qualifying or practice.
    #[arg(long, default_value = "race")]
    session: SessionKind,

    /// JSON catalog file replacing the built-in track catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Calibrate from a local lap CSV instead of the live API.
    #[arg(long)]
    laps_csv: Option<PathBuf>,

    /// Skip telemetry calibration entirely.
    #[arg(long)]
    no_calibration: bool,

    /// Print the plan as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn parse_rain(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("rain probability must be in 0..=100, got {v}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => load_catalog(path)?,
        None => builtin_catalog(),
    };

    let provider: Option<Box<dyn TelemetryProvider>> = if args.no_calibration {
        None
    } else if let Some(path) = &args.laps_csv {
        let replay = ReplayProvider::from_csv(&args.track, path)
            .with_context(|| format!("load laps from {}", path.display()))?;
        Some(Box::new(replay))
    } else {
        Some(Box::new(OpenF1Provider::new(OpenF1Config::default())?))
    };

    let request = StrategyRequest {
        track: args.track,
        year: args.year,
        driver: args.driver,
        rain_probability_pct: args.rain,
        mode: args.session,
    };

    tracing::info!(track = %request.track, year = request.year, "predicting strategy");
    let plan = predict_best_strategy(&request, &catalog, provider.as_deref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", format_plan(&plan));
    }
    Ok(())
}
