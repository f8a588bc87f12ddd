use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::capture::LineSink;

/// A single solve of one model file under one time limit
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub model: PathBuf,
    pub time_limit: u64,
}

impl SolveRequest {
    pub fn new(model: impl Into<PathBuf>, time_limit: u64) -> Self {
        SolveRequest {
            model: model.into(),
            time_limit,
        }
    }

    pub fn model_str(&self) -> Result<&str, SolveError> {
        self.model
            .to_str()
            .ok_or_else(|| SolveError::ModelRead(format!("non UTF-8 path {}", self.model.display())))
    }
}

/// Uniform terminal status every backend maps its native status into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "label")]
pub enum Termination {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimit,
    Interrupted,
    Unknown(String),
}

impl Termination {
    pub fn as_str(&self) -> &str {
        match self {
            Termination::Optimal => "optimal",
            Termination::Infeasible => "infeasible",
            Termination::Unbounded => "unbounded",
            Termination::TimeLimit => "time_limit",
            Termination::Interrupted => "interrupted",
            Termination::Unknown(_) => "unknown",
        }
    }

    /// Whether the backend is expected to hold an incumbent solution.
    pub fn may_have_solution(&self) -> bool {
        !matches!(self, Termination::Infeasible | Termination::Unbounded)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Unknown(label) => write!(f, "unknown ({})", label),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Whatever an adapter managed to read back from its backend after a solve.
///
/// `status` is the backend's own label, kept verbatim for display. Fields the
/// backend does not report stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTelemetry {
    pub solver: String,
    pub time: f64,
    pub iterations: Option<u64>,
    pub nodes: Option<u64>,
    pub gap: Option<f64>,
    pub objective: Option<f64>,
    pub status: String,
    pub termination: Termination,
}

impl RawTelemetry {
    pub fn new(solver: impl Into<String>, status: impl Into<String>, termination: Termination) -> Self {
        RawTelemetry {
            solver: solver.into(),
            time: 0.0,
            iterations: None,
            nodes: None,
            gap: None,
            objective: None,
            status: status.into(),
            termination,
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("failed to read model: {0}")]
    ModelRead(String),

    #[error("failed to configure solver: {0}")]
    Configure(String),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver failed: {0}")]
    Backend(String),

    #[error("output capture failed: {0}")]
    Capture(#[from] std::io::Error),
}

/// Common interface for the benchmarked solver backends
pub trait Solver: Send + Sync {
    /// Read the model at `request.model`, apply the time limit and optimize.
    ///
    /// Console output produced by the backend is forwarded to `sink` line by
    /// line while the solve runs.
    fn solve(&self, request: &SolveRequest, sink: LineSink) -> Result<RawTelemetry, SolveError>;

    /// Get the solver name for logging/debugging
    fn name(&self) -> &str;
}
