//! Track profile resolution: static catalog entry with calibrated
//! overrides, or synthesis from telemetry when the track is unknown.

use model::{DegradationRates, TelemetryLap, TrackCatalog, TrackProfile};

use crate::calibrate::{flying_durations, CalibrationDelta};

/// Race distance assumed when telemetry carries no lap numbers.
const FALLBACK_TOTAL_LAPS: u32 = 50;

/// Quantile used for the synthesized base lap: fast but not fastest, so a
/// single clean lap or a tow does not set the baseline.
const BASE_LAP_QUANTILE: f64 = 0.2;

/// Catalog-wide averages, the fallback for every synthesized field.
#[derive(Debug, Clone, Copy)]
struct CatalogAverages {
    pit_loss_s: f64,
    base_lap_s: f64,
    degradation: DegradationRates,
}

fn catalog_averages(catalog: &TrackCatalog) -> Option<CatalogAverages> {
    if catalog.is_empty() {
        return None;
    }
    let n = catalog.len() as f64;
    let mut avg = CatalogAverages {
        pit_loss_s: 0.0,
        base_lap_s: 0.0,
        degradation: DegradationRates { soft: 0.0, medium: 0.0, hard: 0.0 },
    };
    for profile in catalog.values() {
        avg.pit_loss_s += profile.pit_loss_s;
        avg.base_lap_s += profile.base_lap_s;
        avg.degradation.soft += profile.degradation.soft;
        avg.degradation.medium += profile.degradation.medium;
        avg.degradation.hard += profile.degradation.hard;
    }
    avg.pit_loss_s /= n;
    avg.base_lap_s /= n;
    avg.degradation.soft /= n;
    avg.degradation.medium /= n;
    avg.degradation.hard /= n;
    Some(avg)
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * q).floor() as usize;
    sorted[idx]
}

/// Resolves the profile used for one prediction request.
///
/// A catalog hit is cloned and partially overridden by calibrated values; a
/// miss is synthesized from telemetry when a session resolved. No catalog
/// entry and no telemetry means the track is unknown.
pub fn resolve_profile(
    track: &str,
    catalog: &TrackCatalog,
    session_laps: Option<&[TelemetryLap]>,
    delta: Option<&CalibrationDelta>,
) -> Option<TrackProfile> {
    if let Some(baseline) = catalog.get(track) {
        let mut profile = baseline.clone();
        if let Some(delta) = delta {
            if let Some(pit_loss) = delta.pit_loss_s {
                profile.pit_loss_s = pit_loss;
            }
            for (&compound, &slope) in &delta.degradation {
                profile.degradation.set(compound, slope);
            }
        }
        return Some(profile);
    }

    let laps = session_laps?;
    let avg = catalog_averages(catalog)?;

    let total_laps = laps
        .iter()
        .map(|l| l.lap_number)
        .max()
        .unwrap_or(FALLBACK_TOTAL_LAPS);

    let mut durations = flying_durations(laps);
    durations.sort_by(|a, b| a.total_cmp(b));
    let base_lap_s = if durations.is_empty() {
        avg.base_lap_s
    } else {
        quantile(&durations, BASE_LAP_QUANTILE)
    };

    let mut degradation = avg.degradation;
    let mut pit_loss_s = avg.pit_loss_s;
    if let Some(delta) = delta {
        if let Some(pit_loss) = delta.pit_loss_s {
            pit_loss_s = pit_loss;
        }
        for (&compound, &slope) in &delta.degradation {
            degradation.set(compound, slope);
        }
    }

    Some(TrackProfile { total_laps, pit_loss_s, base_lap_s, degradation })
}
