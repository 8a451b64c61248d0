//! Search driver and prediction entry point.

use std::time::Duration;

use model::{SessionKind, Stint, StintPlan, TrackCatalog, TrackProfile};

use apex_telemetry_core::TelemetryProvider;

use crate::assign::compound_assignments;
use crate::calibrate::{calibrate, CalibrationDelta};
use crate::candidates::lap_partitions;
use crate::cost::{format_clock, stint_time};
use crate::profile::resolve_profile;

/// Ceiling on the whole calibration fetch; expiry means "no calibration",
/// never a prediction failure.
pub const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("no track data supplied")]
    MissingProfiles,
    #[error("unknown track: {0}")]
    UnknownTrack(String),
    #[error("strategy search exhausted without a candidate")]
    SearchExhausted,
}

/// One prediction request.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    pub track: String,
    pub year: u16,
    /// Restrict calibration to one driver's laps when resolvable.
    pub driver: Option<String>,
    /// Accepted and carried for a future wet-weather model; the current
    /// cost model does not use it.
    pub rain_probability_pct: f64,
    /// Session kind calibration draws laps from.
    pub mode: SessionKind,
}

impl StrategyRequest {
    pub fn new(track: impl Into<String>, year: u16) -> Self {
        Self {
            track: track.into(),
            year,
            driver: None,
            rain_probability_pct: 0.0,
            mode: SessionKind::Race,
        }
    }
}

/// Minimum-time plan for one profile.
///
/// Strict less-than incumbent comparison: the first plan found at a tie
/// wins. Within one partition the assignment loop is abandoned once its
/// stop count exceeds the incumbent's by more than one; partitions
/// themselves are never pruned.
pub fn best_plan(profile: &TrackProfile) -> Result<StintPlan, StrategyError> {
    let mut best: Option<StintPlan> = None;

    for partition in lap_partitions(profile.total_laps) {
        let stops = partition.len() - 1;
        for assignment in compound_assignments(partition.len()) {
            if let Some(incumbent) = &best {
                if stops > incumbent.num_stops() + 1 {
                    break;
                }
            }

            let mut total = stops as f64 * profile.pit_loss_s;
            for (&laps, &compound) in partition.iter().zip(&assignment) {
                total += stint_time(profile.base_lap_s, profile.degradation.get(compound), laps);
            }

            if best.as_ref().map_or(true, |b| total < b.total_time_s) {
                let stints = partition
                    .iter()
                    .zip(&assignment)
                    .map(|(&laps, &compound)| Stint { compound, laps })
                    .collect();
                best = Some(StintPlan { stints, total_time_s: total });
            }
        }
    }

    best.ok_or(StrategyError::SearchExhausted)
}

/// Laps backing calibration for this request, or `None` when no session of
/// the requested kind at this track resolves. Provider failures are
/// absence, not errors.
async fn session_laps(
    provider: &dyn TelemetryProvider,
    req: &StrategyRequest,
) -> Option<Vec<model::TelemetryLap>> {
    let sessions = match provider.list_sessions(req.year).await {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::debug!(year = req.year, error = %e, "session listing failed");
            return None;
        }
    };
    let session = sessions
        .into_iter()
        .find(|s| req.mode.matches(&s.kind) && s.track.eq_ignore_ascii_case(&req.track))?;

    let mut laps = match provider.list_laps(&session.session_id).await {
        Ok(laps) => laps,
        Err(e) => {
            tracing::debug!(session_id = %session.session_id, error = %e, "lap fetch failed");
            return None;
        }
    };

    // Driver filter is best effort: an unresolvable name keeps every lap.
    if let Some(name) = &req.driver {
        if let Ok(drivers) = provider.list_drivers(&session.session_id).await {
            let wanted = name.to_lowercase();
            if let Some(driver) = drivers
                .iter()
                .find(|d| d.full_name.to_lowercase().contains(&wanted))
            {
                let filtered: Vec<_> = laps
                    .iter()
                    .filter(|l| l.driver_number == Some(driver.number))
                    .cloned()
                    .collect();
                if !filtered.is_empty() {
                    laps = filtered;
                }
            } else {
                tracing::debug!(driver = %name, "driver not found, calibrating on all laps");
            }
        }
    }

    if laps.is_empty() {
        None
    } else {
        Some(laps)
    }
}

/// Predicts the minimum-time strategy for a race.
///
/// Telemetry, when a provider is supplied, calibrates pit loss and
/// degradation before the search; every calibration failure (including the
/// cooperative timeout) silently falls back to catalog values.
pub async fn predict_best_strategy(
    req: &StrategyRequest,
    catalog: &TrackCatalog,
    provider: Option<&dyn TelemetryProvider>,
) -> Result<StintPlan, StrategyError> {
    if catalog.is_empty() {
        return Err(StrategyError::MissingProfiles);
    }

    let laps = match provider {
        Some(provider) => {
            match tokio::time::timeout(CALIBRATION_TIMEOUT, session_laps(provider, req)).await {
                Ok(laps) => laps,
                Err(_) => {
                    tracing::debug!(track = %req.track, "calibration timed out");
                    None
                }
            }
        }
        None => None,
    };

    let delta: Option<CalibrationDelta> = laps.as_deref().and_then(|laps| match calibrate(laps) {
        Ok(delta) => Some(delta),
        Err(unavailable) => {
            tracing::debug!(track = %req.track, %unavailable, "calibration unavailable");
            None
        }
    });

    let profile = resolve_profile(&req.track, catalog, laps.as_deref(), delta.as_ref())
        .ok_or_else(|| StrategyError::UnknownTrack(req.track.clone()))?;

    tracing::debug!(
        track = %req.track,
        total_laps = profile.total_laps,
        pit_loss_s = profile.pit_loss_s,
        rain_probability_pct = req.rain_probability_pct,
        calibrated = delta.is_some(),
        "profile resolved"
    );

    best_plan(&profile)
}

/// `"Stint 1: <COMPOUND> x <N> laps | ... • Stops: <k> • Total: <clock>"`
pub fn format_plan(plan: &StintPlan) -> String {
    let stints = plan
        .stints
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Stint {}: {} x {} laps", i + 1, s.compound, s.laps))
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "{stints} • Stops: {} • Total: {}",
        plan.num_stops(),
        format_clock(plan.total_time_s)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_io::{lap, ReplayProvider};
    use apex_telemetry_core::TelemetryError;
    use model::{Compound, DegradationRates, DriverInfo, SessionInfo, TelemetryLap};
    use std::collections::{BTreeSet, HashSet};

    fn scenario_profile() -> TrackProfile {
        TrackProfile {
            total_laps: 58,
            pit_loss_s: 20.0,
            base_lap_s: 92.0,
            degradation: DegradationRates { soft: 0.13, medium: 0.09, hard: 0.065 },
        }
    }

    fn catalog() -> TrackCatalog {
        let mut cat = TrackCatalog::new();
        cat.insert("Fictionring".into(), scenario_profile());
        cat
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl TelemetryProvider for FailingProvider {
        async fn list_sessions(&self, _year: u16) -> Result<Vec<SessionInfo>, TelemetryError> {
            Err(TelemetryError::Msg("boom".into()))
        }
        async fn list_laps(&self, _id: &str) -> Result<Vec<TelemetryLap>, TelemetryError> {
            Err(TelemetryError::Msg("boom".into()))
        }
        async fn list_drivers(&self, _id: &str) -> Result<Vec<DriverInfo>, TelemetryError> {
            Err(TelemetryError::Msg("boom".into()))
        }
    }

    struct StalledProvider;

    #[async_trait::async_trait]
    impl TelemetryProvider for StalledProvider {
        async fn list_sessions(&self, _year: u16) -> Result<Vec<SessionInfo>, TelemetryError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        async fn list_laps(&self, _id: &str) -> Result<Vec<TelemetryLap>, TelemetryError> {
            Ok(Vec::new())
        }
        async fn list_drivers(&self, _id: &str) -> Result<Vec<DriverInfo>, TelemetryError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn scenario_best_plan_is_a_two_or_three_stopper() {
        let plan = best_plan(&scenario_profile()).unwrap();
        assert_eq!(plan.total_laps(), 58);
        assert!((2..=3).contains(&plan.num_stops()), "{plan:?}");

        let distinct: BTreeSet<Compound> = plan.compounds().collect();
        assert!(distinct.len() >= 2);

        // Bounds: faster than three stops plus soft degradation over the
        // whole distance, slower than degradation-free flat laps.
        let lower = 58.0 * 92.0;
        let upper = lower + 3.0 * 20.0 + 0.13 * (58.0 * 59.0 / 2.0);
        assert!(plan.total_time_s > lower, "{}", plan.total_time_s);
        assert!(plan.total_time_s < upper, "{}", plan.total_time_s);
    }

    #[test]
    fn plan_laps_always_sum_to_race_distance() {
        for (laps, base) in [(44u32, 106.0), (53, 83.5), (58, 92.0), (78, 74.0)] {
            let profile = TrackProfile {
                total_laps: laps,
                pit_loss_s: 21.0,
                base_lap_s: base,
                degradation: DegradationRates { soft: 0.12, medium: 0.09, hard: 0.06 },
            };
            let plan = best_plan(&profile).unwrap();
            assert_eq!(plan.total_laps(), laps);
            assert!((2..=4).contains(&plan.stints.len()));
            let distinct: HashSet<Compound> = plan.compounds().collect();
            assert!(distinct.len() >= 2);
        }
    }

    #[test]
    fn no_stop_plans_never_win() {
        // Even a brutal pit loss cannot make the single stint legal: the
        // two-compound floor leaves 1-stint candidates with no assignment.
        let mut profile = scenario_profile();
        profile.pit_loss_s = 30.0;
        profile.degradation = DegradationRates { soft: 0.031, medium: 0.031, hard: 0.03 };
        let plan = best_plan(&profile).unwrap();
        assert!(plan.stints.len() >= 2, "{plan:?}");
    }

    #[test]
    fn one_lap_race_exhausts_the_search() {
        let mut profile = scenario_profile();
        profile.total_laps = 1;
        assert!(matches!(best_plan(&profile), Err(StrategyError::SearchExhausted)));
    }

    #[tokio::test]
    async fn empty_catalog_is_missing_input() {
        let req = StrategyRequest::new("Fictionring", 2024);
        let result = predict_best_strategy(&req, &TrackCatalog::new(), None).await;
        assert!(matches!(result, Err(StrategyError::MissingProfiles)));
    }

    #[tokio::test]
    async fn absent_profile_is_unknown_track() {
        let req = StrategyRequest::new("Nowhere", 2024);
        let result = predict_best_strategy(&req, &catalog(), None).await;
        assert!(matches!(result, Err(StrategyError::UnknownTrack(t)) if t == "Nowhere"));
    }

    #[tokio::test]
    async fn identical_inputs_yield_identical_plans() {
        let req = StrategyRequest::new("Fictionring", 2024);
        let cat = catalog();
        let a = predict_best_strategy(&req, &cat, None).await.unwrap();
        let b = predict_best_strategy(&req, &cat, None).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_catalog_profile() {
        let req = StrategyRequest::new("Fictionring", 2024);
        let cat = catalog();
        let with = predict_best_strategy(&req, &cat, Some(&FailingProvider)).await.unwrap();
        let without = predict_best_strategy(&req, &cat, None).await.unwrap();
        assert_eq!(with, without);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_into_fallback() {
        let req = StrategyRequest::new("Fictionring", 2024);
        let cat = catalog();
        let with = predict_best_strategy(&req, &cat, Some(&StalledProvider)).await.unwrap();
        let without = predict_best_strategy(&req, &cat, None).await.unwrap();
        assert_eq!(with, without);
    }

    fn replay_session(laps: Vec<TelemetryLap>, drivers: Vec<DriverInfo>) -> ReplayProvider {
        ReplayProvider::new().with_session(
            SessionInfo { session_id: "s1".into(), track: "Fictionring".into(), kind: "Race".into() },
            laps,
            drivers,
        )
    }

    #[tokio::test]
    async fn calibrated_pit_loss_raises_the_modelled_total() {
        // 40 flying laps near 92s plus a 122s pit lap: max - median clamps
        // to 30s, well above the catalog's 20s.
        let mut laps: Vec<TelemetryLap> =
            (1..=40).map(|n| lap(n, 91.5 + 0.025 * n as f64, None)).collect();
        laps.push(lap(41, 122.0, None));
        let provider = replay_session(laps, Vec::new());

        let req = StrategyRequest::new("Fictionring", 2024);
        let cat = catalog();
        let calibrated = predict_best_strategy(&req, &cat, Some(&provider)).await.unwrap();
        let baseline = predict_best_strategy(&req, &cat, None).await.unwrap();
        assert!(calibrated.total_time_s > baseline.total_time_s);
    }

    #[tokio::test]
    async fn driver_filter_restricts_calibration_laps() {
        let mut laps = Vec::new();
        for n in 1..=20 {
            let mut l = lap(n, 90.0 + 0.2 * n as f64, Some(Compound::Medium));
            l.driver_number = Some(44);
            laps.push(l);
            let mut l = lap(n, 90.0 + 0.05 * n as f64, Some(Compound::Medium));
            l.driver_number = Some(16);
            laps.push(l);
        }
        let drivers = vec![
            DriverInfo { number: 44, full_name: "Lewis Hamilton".into(), team_name: "Ferrari".into() },
            DriverInfo { number: 16, full_name: "Charles Leclerc".into(), team_name: "Ferrari".into() },
        ];
        let provider = replay_session(laps, drivers);

        let mut req = StrategyRequest::new("Fictionring", 2024);
        req.driver = Some("hamilton".into());
        let got = session_laps(&provider, &req).await.unwrap();
        assert_eq!(got.len(), 20);
        assert!(got.iter().all(|l| l.driver_number == Some(44)));
    }

    #[tokio::test]
    async fn unresolvable_driver_keeps_every_lap() {
        let laps: Vec<TelemetryLap> = (1..=10).map(|n| lap(n, 92.0, None)).collect();
        let provider = replay_session(laps, Vec::new());
        let mut req = StrategyRequest::new("Fictionring", 2024);
        req.driver = Some("Nobody".into());
        let got = session_laps(&provider, &req).await.unwrap();
        assert_eq!(got.len(), 10);
    }

    #[tokio::test]
    async fn session_kind_and_track_must_both_match() {
        let laps: Vec<TelemetryLap> = (1..=10).map(|n| lap(n, 92.0, None)).collect();
        let provider = ReplayProvider::new().with_session(
            SessionInfo { session_id: "q".into(), track: "Fictionring".into(), kind: "Qualifying".into() },
            laps,
            Vec::new(),
        );
        let req = StrategyRequest::new("Fictionring", 2024);
        assert!(session_laps(&provider, &req).await.is_none());

        let mut req = StrategyRequest::new("Fictionring", 2024);
        req.mode = SessionKind::Qualifying;
        assert!(session_laps(&provider, &req).await.is_some());
    }

    #[test]
    fn format_plan_matches_expected_shape() {
        let plan = StintPlan {
            stints: vec![
                Stint { compound: Compound::Medium, laps: 21 },
                Stint { compound: Compound::Hard, laps: 21 },
                Stint { compound: Compound::Hard, laps: 16 },
            ],
            total_time_s: 5426.5,
        };
        assert_eq!(
            format_plan(&plan),
            "Stint 1: MEDIUM x 21 laps | Stint 2: HARD x 21 laps | Stint 3: HARD x 16 laps \
             • Stops: 2 • Total: 90:26.500"
        );
    }

    #[test]
    fn ties_keep_the_first_plan_found() {
        // Symmetric degradation rates make mirrored assignments tie; the
        // search must return the first one it scored.
        let profile = TrackProfile {
            total_laps: 40,
            pit_loss_s: 20.0,
            base_lap_s: 90.0,
            degradation: DegradationRates { soft: 0.08, medium: 0.08, hard: 0.08 },
        };
        let plan = best_plan(&profile).unwrap();
        // First partition is [17, 23]; first assignment is SOFT, MEDIUM.
        assert_eq!(plan.stints[0].compound, Compound::Soft);
        assert_eq!(plan.stints[1].compound, Compound::Medium);
    }
}
