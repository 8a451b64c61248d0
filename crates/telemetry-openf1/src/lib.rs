//! Telemetry provider backed by an OpenF1-style REST API.
//!
//! Lap durations come from `/laps`; compound tags live on `/stints` and are
//! joined onto laps by lap-number range. A failed stint fetch degrades to
//! laps without compounds rather than an error.

use anyhow::Context;
use serde::Deserialize;

use apex_telemetry_core::{TelemetryError, TelemetryProvider};
use model::{DriverInfo, SessionInfo, TelemetryLap};

#[derive(Clone, Debug)]
pub struct OpenF1Config {
    pub base_url: String,
    pub request_timeout_s: u64,
}

impl Default for OpenF1Config {
    fn default() -> Self {
        Self { base_url: "https://api.openf1.org/v1".into(), request_timeout_s: 8 }
    }
}

pub struct OpenF1Provider {
    cfg: OpenF1Config,
    http: reqwest::Client,
}

impl OpenF1Provider {
    pub fn new(cfg: OpenF1Config) -> Result<Self, TelemetryError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_s))
            .build()
            .context("build http client")?;
        Ok(Self { cfg, http })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TelemetryError> {
        let url = format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TelemetryError::Msg(format!("GET {url}: status {status}")));
        }
        let body = resp.json::<T>().await.with_context(|| format!("decode {url}"))?;
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct SessionRow {
    session_key: i64,
    circuit_short_name: String,
    session_name: String,
}

#[derive(Debug, Deserialize)]
struct LapRow {
    lap_number: u32,
    driver_number: Option<u32>,
    lap_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StintRow {
    driver_number: Option<u32>,
    compound: Option<String>,
    lap_start: Option<u32>,
    lap_end: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DriverRow {
    driver_number: u32,
    full_name: String,
    #[serde(default)]
    team_name: Option<String>,
}

/// Joins stint compound tags onto laps by driver and lap-number range.
fn attach_compounds(laps: &mut [TelemetryLap], stints: &[StintRow]) {
    for lap in laps.iter_mut() {
        let hit = stints.iter().find(|s| {
            s.driver_number == lap.driver_number
                && s.lap_start.is_some_and(|a| a <= lap.lap_number)
                && s.lap_end.is_some_and(|b| lap.lap_number <= b)
        });
        lap.compound = hit.and_then(|s| s.compound.clone());
    }
}

#[async_trait::async_trait]
impl TelemetryProvider for OpenF1Provider {
    async fn list_sessions(&self, year: u16) -> Result<Vec<SessionInfo>, TelemetryError> {
        let rows: Vec<SessionRow> =
            self.get_json("sessions", &[("year", year.to_string())]).await?;
        Ok(rows
            .into_iter()
            .map(|r| SessionInfo {
                session_id: r.session_key.to_string(),
                track: r.circuit_short_name,
                kind: r.session_name,
            })
            .collect())
    }

    async fn list_laps(&self, session_id: &str) -> Result<Vec<TelemetryLap>, TelemetryError> {
        let rows: Vec<LapRow> =
            self.get_json("laps", &[("session_key", session_id.to_string())]).await?;
        let mut laps: Vec<TelemetryLap> = rows
            .into_iter()
            .map(|r| TelemetryLap {
                lap_number: r.lap_number,
                driver_number: r.driver_number,
                duration_s: r.lap_duration,
                compound: None,
            })
            .collect();

        match self
            .get_json::<Vec<StintRow>>("stints", &[("session_key", session_id.to_string())])
            .await
        {
            Ok(stints) => attach_compounds(&mut laps, &stints),
            Err(e) => tracing::debug!(session_id, error = %e, "stint fetch failed, laps keep no compound"),
        }
        Ok(laps)
    }

    async fn list_drivers(&self, session_id: &str) -> Result<Vec<DriverInfo>, TelemetryError> {
        let rows: Vec<DriverRow> =
            self.get_json("drivers", &[("session_key", session_id.to_string())]).await?;
        Ok(rows
            .into_iter()
            .map(|r| DriverInfo {
                number: r.driver_number,
                full_name: r.full_name,
                team_name: r.team_name.unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_row_parses_openf1_shape() {
        let body = r#"[
            {"session_key": 9598, "circuit_short_name": "Monza",
             "session_name": "Race", "year": 2024, "country_name": "Italy"}
        ]"#;
        let rows: Vec<SessionRow> = serde_json::from_str(body).unwrap();
        assert_eq!(rows[0].session_key, 9598);
        assert_eq!(rows[0].circuit_short_name, "Monza");
        assert_eq!(rows[0].session_name, "Race");
    }

    #[test]
    fn lap_row_tolerates_missing_duration() {
        let body = r#"[
            {"lap_number": 1, "driver_number": 16, "lap_duration": null},
            {"lap_number": 2, "driver_number": 16, "lap_duration": 84.31}
        ]"#;
        let rows: Vec<LapRow> = serde_json::from_str(body).unwrap();
        assert_eq!(rows[0].lap_duration, None);
        assert_eq!(rows[1].lap_duration, Some(84.31));
    }

    #[test]
    fn attach_compounds_joins_by_driver_and_range() {
        let mut laps = vec![
            TelemetryLap { lap_number: 3, driver_number: Some(16), duration_s: Some(84.0), compound: None },
            TelemetryLap { lap_number: 30, driver_number: Some(16), duration_s: Some(85.0), compound: None },
            TelemetryLap { lap_number: 3, driver_number: Some(55), duration_s: Some(84.5), compound: None },
        ];
        let stints = vec![
            StintRow { driver_number: Some(16), compound: Some("MEDIUM".into()), lap_start: Some(1), lap_end: Some(20) },
            StintRow { driver_number: Some(16), compound: Some("HARD".into()), lap_start: Some(21), lap_end: Some(53) },
        ];
        attach_compounds(&mut laps, &stints);
        assert_eq!(laps[0].compound.as_deref(), Some("MEDIUM"));
        assert_eq!(laps[1].compound.as_deref(), Some("HARD"));
        assert_eq!(laps[2].compound, None);
    }
}
