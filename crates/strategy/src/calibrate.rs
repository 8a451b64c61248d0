//! Cost-model calibration from historical lap telemetry.
//!
//! Both estimators are defensive: sparse or degenerate input yields
//! [`Unavailable`], never an error the caller has to surface.

use model::{Compound, TelemetryLap};
use std::collections::BTreeMap;

/// Flying-lap plausibility band, exclusive on both ends.
pub const FLYING_LAP_MIN_S: f64 = 30.0;
pub const FLYING_LAP_MAX_S: f64 = 200.0;

const MIN_PIT_SAMPLES: usize = 10;
const PIT_LOSS_MIN_S: f64 = 15.0;
const PIT_LOSS_MAX_S: f64 = 30.0;

const MIN_DEG_POINTS: usize = 12;
const DEG_SLOPE_MIN: f64 = 0.03;
const DEG_SLOPE_MAX: f64 = 0.25;

/// The telemetry at hand cannot support an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not enough usable telemetry to calibrate")]
pub struct Unavailable;

/// Calibrated adjustments to a track profile. Absent fields keep whatever
/// the catalog (or synthesis fallback) provides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationDelta {
    pub pit_loss_s: Option<f64>,
    pub degradation: BTreeMap<Compound, f64>,
}

/// Lap durations inside the flying-lap band.
pub fn flying_durations(laps: &[TelemetryLap]) -> Vec<f64> {
    laps.iter()
        .filter_map(|l| l.duration_s)
        .filter(|d| *d > FLYING_LAP_MIN_S && *d < FLYING_LAP_MAX_S)
        .collect()
}

/// Estimates time lost to one pit stop as `max - median` of in-band lap
/// durations: a pit lap sits far above the flying-lap median. The clamp
/// guards against safety-car or red-flag artifacts.
pub fn infer_pit_loss(laps: &[TelemetryLap]) -> Result<f64, Unavailable> {
    let mut durations = flying_durations(laps);
    if durations.len() < MIN_PIT_SAMPLES {
        return Err(Unavailable);
    }
    durations.sort_by(|a, b| a.total_cmp(b));
    let median = durations[durations.len() / 2];
    let max = durations[durations.len() - 1];
    Ok((max - median).clamp(PIT_LOSS_MIN_S, PIT_LOSS_MAX_S))
}

/// Per-compound degradation slopes from OLS regression of duration against
/// lap number. Compounds succeed or fail independently; an empty result is
/// reported as [`Unavailable`].
pub fn infer_degradation(laps: &[TelemetryLap]) -> Result<BTreeMap<Compound, f64>, Unavailable> {
    let mut groups: BTreeMap<Compound, Vec<(f64, f64)>> = BTreeMap::new();
    for lap in laps {
        let compound = lap.compound.as_deref().and_then(Compound::parse);
        if let (Some(compound), Some(duration)) = (compound, lap.duration_s) {
            groups
                .entry(compound)
                .or_default()
                .push((lap.lap_number as f64, duration));
        }
    }

    let mut slopes = BTreeMap::new();
    for (compound, points) in groups {
        if points.len() < MIN_DEG_POINTS {
            continue;
        }
        if let Some(slope) = ols_slope(&points) {
            slopes.insert(compound, slope.clamp(DEG_SLOPE_MIN, DEG_SLOPE_MAX));
        }
    }
    if slopes.is_empty() {
        return Err(Unavailable);
    }
    Ok(slopes)
}

/// `sum((x - x̄)(y - ȳ)) / sum((x - x̄)²)`, `None` when the denominator is
/// zero (constant lap numbers).
fn ols_slope(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in points {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Runs both estimators; fails only when neither produced anything.
pub fn calibrate(laps: &[TelemetryLap]) -> Result<CalibrationDelta, Unavailable> {
    let pit_loss_s = infer_pit_loss(laps).ok();
    let degradation = infer_degradation(laps).unwrap_or_default();
    if pit_loss_s.is_none() && degradation.is_empty() {
        return Err(Unavailable);
    }
    Ok(CalibrationDelta { pit_loss_s, degradation })
}
