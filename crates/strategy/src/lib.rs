//! Minimum-time tyre strategy prediction.
//!
//! The engine scores bounded samples of stint partitions against every legal
//! compound assignment and keeps the cheapest plan. Historical telemetry,
//! when a session can be resolved, calibrates the cost model first; every
//! calibration failure falls back silently to catalog values.

pub mod assign;
pub mod calibrate;
pub mod candidates;
pub mod cost;
pub mod engine;
pub mod profile;

pub use assign::compound_assignments;
pub use calibrate::{calibrate, CalibrationDelta, Unavailable};
pub use candidates::lap_partitions;
pub use cost::{format_clock, stint_time, FUEL_PENALTY_PER_LAP};
pub use engine::{
    best_plan, format_plan, predict_best_strategy, StrategyError, StrategyRequest,
};
pub use profile::resolve_profile;
