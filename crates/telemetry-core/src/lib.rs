//! Provider interface for historical lap telemetry.
//!
//! The strategy engine consumes telemetry through this trait only; any
//! failure is treated by callers as absence of data, never as a fatal
//! prediction error.

use model::{DriverInfo, SessionInfo, TelemetryLap};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Trait for any source of historical session telemetry.
#[async_trait::async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Sessions held for a season year.
    async fn list_sessions(&self, year: u16) -> Result<Vec<SessionInfo>, TelemetryError>;

    /// Per-lap records for one session.
    async fn list_laps(&self, session_id: &str) -> Result<Vec<TelemetryLap>, TelemetryError>;

    /// Driver identities for one session.
    async fn list_drivers(&self, session_id: &str) -> Result<Vec<DriverInfo>, TelemetryError>;
}
