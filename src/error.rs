//! Error types for the simulation engine.
//!
//! Every engine operation returns `SimResult<T>`. Errors are raised at the call
//! that detects them and are never retried internally.

use thiserror::Error;

use crate::simulation::states::BodyId;

/// Result type alias for gravsim operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for the engine.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Input validation =====
    /// A scalar or vector input is outside its domain (negative mass, NaN, wrong length).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Two bodies share a position where a distance is needed.
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(String),

    /// Orbit construction was asked for a body kind the solver does not build.
    #[error("unsupported body type for orbit construction: {0}")]
    UnsupportedBodyType(String),

    // ===== Simulation state =====
    /// Stepping or running with no attached bodies.
    #[error("the simulation does not contain any body")]
    EmptySimulation,

    /// History-dependent call made before `run`.
    #[error("the simulation has no recorded history, call `run` first")]
    SimulationNotRun,

    // ===== References =====
    /// Label does not match any attached body.
    #[error("no body labelled '{0}' in the simulation")]
    UnknownLabel(String),

    /// Id or index that does not name an attached body.
    #[error("invalid body reference: {0}")]
    InvalidReference(String),

    // ===== Time =====
    /// Instant outside `[initial_instant, final_instant]`.
    #[error("instant {instant} is outside the simulation range [{start}, {end}]")]
    OutOfRange {
        instant: f64,
        start: f64,
        end: f64,
    },

    /// Overlay pause/stop beyond the recorded history.
    #[error("invalid time window: {0}")]
    InvalidTimeWindow(String),

    // ===== I/O =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateConfiguration(message.into())
    }

    pub fn unknown_body(id: BodyId) -> Self {
        Self::InvalidReference(format!("body {id} is not attached to this simulation"))
    }
}
