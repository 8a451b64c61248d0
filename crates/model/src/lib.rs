//! Core data types shared by the strategy engine and telemetry crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Dry tyre compound. Exactly three compounds exist in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
}

impl Compound {
    pub const ALL: [Compound; 3] = [Compound::Soft, Compound::Medium, Compound::Hard];

    /// Parses an upper/lower/mixed-case compound tag. Unknown tags map to `None`.
    pub fn parse(label: &str) -> Option<Compound> {
        match label.trim().to_ascii_uppercase().as_str() {
            "SOFT" => Some(Compound::Soft),
            "MEDIUM" => Some(Compound::Medium),
            "HARD" => Some(Compound::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seconds added per lap of tyre age, one rate per compound.
///
/// Modelled as a struct rather than a map so a profile cannot exist with a
/// missing compound entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationRates {
    pub soft: f64,
    pub medium: f64,
    pub hard: f64,
}

impl DegradationRates {
    pub fn get(&self, compound: Compound) -> f64 {
        match compound {
            Compound::Soft => self.soft,
            Compound::Medium => self.medium,
            Compound::Hard => self.hard,
        }
    }

    pub fn set(&mut self, compound: Compound, rate: f64) {
        match compound {
            Compound::Soft => self.soft = rate,
            Compound::Medium => self.medium = rate,
            Compound::Hard => self.hard = rate,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Compound, f64)> + '_ {
        Compound::ALL.iter().map(move |&c| (c, self.get(c)))
    }
}

/// Physical/strategic baseline for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackProfile {
    pub total_laps: u32,
    pub pit_loss_s: f64,
    pub base_lap_s: f64,
    pub degradation: DegradationRates,
}

impl TrackProfile {
    /// Checks the profile invariant: positive lap count, and every numeric
    /// field finite and strictly positive.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.total_laps == 0 {
            return Err(ProfileError::ZeroLaps);
        }
        let fields = [
            ("pit_loss_s", self.pit_loss_s),
            ("base_lap_s", self.base_lap_s),
            ("degradation.soft", self.degradation.soft),
            ("degradation.medium", self.degradation.medium),
            ("degradation.hard", self.degradation.hard),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProfileError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("total_laps must be positive")]
    ZeroLaps,
    #[error("{field} must be finite and positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

/// Static catalog: track name (case-sensitive) to baseline profile.
pub type TrackCatalog = BTreeMap<String, TrackProfile>;

/// One observed lap from a telemetry provider. Fields the source failed to
/// record are `None`; consumers filter rather than fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryLap {
    pub lap_number: u32,
    pub driver_number: Option<u32>,
    pub duration_s: Option<f64>,
    pub compound: Option<String>,
}

/// A race-weekend session as listed by a telemetry provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub track: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub number: u32,
    pub full_name: String,
    pub team_name: String,
}

/// Which session kind calibration should draw laps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    Race,
    Qualifying,
    Practice,
}

impl SessionKind {
    /// Matches a provider's free-form session label ("Race", "Practice 2", ...).
    pub fn matches(&self, label: &str) -> bool {
        let label = label.trim();
        let prefix = match self {
            SessionKind::Race => "race",
            SessionKind::Qualifying => "qualifying",
            SessionKind::Practice => "practice",
        };
        matches!(label.get(..prefix.len()), Some(head) if head.eq_ignore_ascii_case(prefix))
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "race" => Ok(SessionKind::Race),
            "qualifying" | "quali" => Ok(SessionKind::Qualifying),
            "practice" => Ok(SessionKind::Practice),
            other => Err(format!("unknown session kind: {other}")),
        }
    }
}

/// One stint of a strategy plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stint {
    pub compound: Compound,
    pub laps: u32,
}

/// A complete strategy: ordered stints plus the modelled race time.
/// Immutable once returned by the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StintPlan {
    pub stints: Vec<Stint>,
    pub total_time_s: f64,
}

impl StintPlan {
    pub fn num_stops(&self) -> usize {
        self.stints.len().saturating_sub(1)
    }

    pub fn total_laps(&self) -> u32 {
        self.stints.iter().map(|s| s.laps).sum()
    }

    pub fn compounds(&self) -> impl Iterator<Item = Compound> + '_ {
        self.stints.iter().map(|s| s.compound)
    }
}
