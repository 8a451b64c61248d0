//! Track catalog loading and offline lap telemetry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use apex_telemetry_core::{TelemetryError, TelemetryProvider};
use model::{
    Compound, DegradationRates, DriverInfo, SessionInfo, TelemetryLap, TrackCatalog, TrackProfile,
};

fn profile(
    total_laps: u32,
    pit_loss_s: f64,
    base_lap_s: f64,
    soft: f64,
    medium: f64,
    hard: f64,
) -> TrackProfile {
    TrackProfile {
        total_laps,
        pit_loss_s,
        base_lap_s,
        degradation: DegradationRates { soft, medium, hard },
    }
}

/// Default catalog so predictions work with zero configuration.
/// A JSON catalog file replaces it entirely when supplied.
pub fn builtin_catalog() -> TrackCatalog {
    let mut cat = TrackCatalog::new();
    cat.insert("Monza".into(), profile(53, 21.5, 83.5, 0.125, 0.088, 0.062));
    cat.insert("Monaco".into(), profile(78, 23.5, 74.0, 0.105, 0.075, 0.055));
    cat.insert("Silverstone".into(), profile(52, 20.5, 88.0, 0.135, 0.095, 0.068));
    cat.insert("Spa-Francorchamps".into(), profile(44, 22.5, 106.0, 0.14, 0.10, 0.07));
    cat.insert("Sakhir".into(), profile(57, 24.0, 93.0, 0.15, 0.105, 0.072));
    cat.insert("Suzuka".into(), profile(53, 23.0, 91.5, 0.13, 0.092, 0.066));
    cat
}

/// Loads a catalog from a JSON object `{ "<track>": <profile>, ... }`.
/// Every entry is validated; a single bad entry fails the load.
pub fn load_catalog(path: &Path) -> Result<TrackCatalog> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read catalog {}", path.display()))?;
    let cat: TrackCatalog = serde_json::from_str(&data)
        .with_context(|| format!("parse catalog {}", path.display()))?;
    for (track, profile) in &cat {
        profile
            .validate()
            .with_context(|| format!("catalog entry {track:?}"))?;
    }
    Ok(cat)
}

#[derive(Serialize, Deserialize)]
struct LapRow {
    lap_number: u32,
    driver_number: Option<u32>,
    duration_s: Option<f64>,
    compound: Option<String>,
}

/// Imports laps from a CSV file with the header
/// `lap_number,driver_number,duration_s,compound`. Empty cells become `None`.
pub fn import_laps_csv(path: &Path) -> Result<Vec<TelemetryLap>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("open laps {}", path.display()))?;
    let mut laps = Vec::new();
    for rec in rdr.deserialize() {
        let r: LapRow = rec?;
        laps.push(TelemetryLap {
            lap_number: r.lap_number,
            driver_number: r.driver_number,
            duration_s: r.duration_s,
            compound: r.compound.filter(|c| !c.is_empty()),
        });
    }
    Ok(laps)
}

pub fn export_laps_csv(laps: &[TelemetryLap], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    for l in laps {
        w.serialize(LapRow {
            lap_number: l.lap_number,
            driver_number: l.driver_number,
            duration_s: l.duration_s,
            compound: l.compound.clone(),
        })?;
    }
    w.flush()?;
    Ok(())
}

/// In-memory provider over imported laps. Serves the same trait as the live
/// source so calibration runs identically offline.
#[derive(Default)]
pub struct ReplayProvider {
    sessions: Vec<SessionInfo>,
    laps: HashMap<String, Vec<TelemetryLap>>,
    drivers: HashMap<String, Vec<DriverInfo>>,
}

impl ReplayProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(
        mut self,
        session: SessionInfo,
        laps: Vec<TelemetryLap>,
        drivers: Vec<DriverInfo>,
    ) -> Self {
        self.laps.insert(session.session_id.clone(), laps);
        self.drivers.insert(session.session_id.clone(), drivers);
        self.sessions.push(session);
        self
    }

    /// One-session provider for a CSV lap file, registered as a Race at the
    /// given track.
    pub fn from_csv(track: &str, path: &Path) -> Result<Self> {
        let laps = import_laps_csv(path)?;
        Ok(Self::new().with_session(
            SessionInfo {
                session_id: "replay".into(),
                track: track.to_string(),
                kind: "Race".into(),
            },
            laps,
            Vec::new(),
        ))
    }
}

#[async_trait::async_trait]
impl TelemetryProvider for ReplayProvider {
    // Replay files carry no season metadata; the year filter is a no-op.
    async fn list_sessions(&self, _year: u16) -> Result<Vec<SessionInfo>, TelemetryError> {
        Ok(self.sessions.clone())
    }

    async fn list_laps(&self, session_id: &str) -> Result<Vec<TelemetryLap>, TelemetryError> {
        self.laps
            .get(session_id)
            .cloned()
            .ok_or_else(|| TelemetryError::Msg(format!("unknown session: {session_id}")))
    }

    async fn list_drivers(&self, session_id: &str) -> Result<Vec<DriverInfo>, TelemetryError> {
        self.drivers
            .get(session_id)
            .cloned()
            .ok_or_else(|| TelemetryError::Msg(format!("unknown session: {session_id}")))
    }
}

/// Convenience used by tests and fixtures.
pub fn lap(lap_number: u32, duration_s: f64, compound: Option<Compound>) -> TelemetryLap {
    TelemetryLap {
        lap_number,
        driver_number: Some(1),
        duration_s: Some(duration_s),
        compound: compound.map(|c| c.as_str().to_string()),
    }
}
