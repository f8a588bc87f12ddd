use std::time::{Duration, Instant};

use crate::capture::{with_captured_stdout, LineSink};
use crate::domain::solver::{RawTelemetry, SolveError, SolveRequest, Solver, Termination};

use grb::prelude::*;

// Gurobi's optimization status codes, as documented for the `Status` attribute.
const STATUS_CODES: [(i32, &str); 17] = [
    (1, "LOADED"),
    (2, "OPTIMAL"),
    (3, "INFEASIBLE"),
    (4, "INF_OR_UNBD"),
    (5, "UNBOUNDED"),
    (6, "CUTOFF"),
    (7, "ITERATION_LIMIT"),
    (8, "NODE_LIMIT"),
    (9, "TIME_LIMIT"),
    (10, "SOLUTION_LIMIT"),
    (11, "INTERRUPTED"),
    (12, "NUMERIC"),
    (13, "SUBOPTIMAL"),
    (14, "INPROGRESS"),
    (15, "USER_OBJ_LIMIT"),
    (16, "WORK_LIMIT"),
    (17, "MEM_LIMIT"),
];

/// Gurobi solver implementation
pub struct GurobiSolver;

impl GurobiSolver {
    pub fn new() -> Self {
        GurobiSolver
    }

    /// Label for an integer status code
    fn status_label(code: i32) -> String {
        STATUS_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| format!("STATUS_{}", code))
    }

    /// Convert Gurobi status code to our termination
    fn convert_status(code: i32, label: &str) -> Termination {
        match code {
            2 => Termination::Optimal,
            3 => Termination::Infeasible,
            5 => Termination::Unbounded,
            9 => Termination::TimeLimit,
            11 => Termination::Interrupted,
            _ => Termination::Unknown(label.to_string()),
        }
    }

    fn solve_captured(request: &SolveRequest) -> Result<RawTelemetry, SolveError> {
        let path = request.model_str()?;

        let env = Env::new("").map_err(|e| SolveError::Configure(format!("failed to create Gurobi environment: {}", e)))?;

        let mut model = Model::read_from(path, &env).map_err(|e| SolveError::ModelRead(e.to_string()))?;

        model
            .set_param(param::TimeLimit, request.time_limit as f64)
            .map_err(|e| SolveError::Configure(format!("failed to set Gurobi time limit: {}", e)))?;

        let start = Instant::now();
        model
            .optimize()
            .map_err(|e| SolveError::Backend(format!("failed to optimize: {}", e)))?;

        let status = model
            .status()
            .map_err(|e| SolveError::Backend(format!("failed to get model status: {}", e)))?;
        let code = status as i32;
        let label = Self::status_label(code);

        let (major, minor, technical) = grb::version();
        let mut telemetry = RawTelemetry::new(
            format!("Gurobi {}.{}.{}", major, minor, technical),
            label.clone(),
            Self::convert_status(code, &label),
        );

        // Attributes without a value for this model (gap on an LP, objective
        // without incumbent) raise; those stay unknown.
        telemetry.time = elapsed(optional(model.get_attr(attr::Runtime), "Runtime"), start.elapsed());
        telemetry.iterations = optional(model.get_attr(attr::IterCount), "IterCount").map(|v| v as u64);
        telemetry.nodes = optional(model.get_attr(attr::NodeCount), "NodeCount").map(|v| v as u64);
        telemetry.gap = optional(model.get_attr(attr::MIPGap), "MIPGap");
        telemetry.objective = optional(model.get_attr(attr::ObjVal), "ObjVal");

        Ok(telemetry)
    }
}

/// Gurobi's own runtime, else the wall time measured around `optimize`
fn elapsed(runtime: Option<f64>, measured: Duration) -> f64 {
    runtime.unwrap_or_else(|| measured.as_secs_f64())
}

fn optional<T, E: std::fmt::Display>(value: Result<T, E>, attribute: &str) -> Option<T> {
    match value {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("Gurobi attribute {} unavailable: {}", attribute, e);
            None
        }
    }
}

impl Solver for GurobiSolver {
    fn solve(&self, request: &SolveRequest, sink: LineSink) -> Result<RawTelemetry, SolveError> {
        // Gurobi logs to the console only, so the whole solve runs captured.
        with_captured_stdout(sink, || Self::solve_captured(request))?
    }

    fn name(&self) -> &str {
        "Gurobi"
    }
}
