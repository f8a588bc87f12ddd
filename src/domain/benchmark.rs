use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use serde::Serialize;

use crate::capture::OutputBuffer;
use crate::domain::normalize::ResultRecord;
use crate::domain::solver::{SolveRequest, Solver};
use crate::domain::solver_factory::SolverType;

/// Outcome of one selected solver in a benchmark run.
///
/// Exactly one of `record` and `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkEntry {
    pub solver: SolverType,
    pub record: Option<ResultRecord>,
    pub error: Option<String>,
    pub output: String,
}

impl BenchmarkEntry {
    /// Label for table rows: the record's solver label, else the plain name
    pub fn label(&self) -> &str {
        match &self.record {
            Some(record) => &record.solver,
            None => self.solver.name(),
        }
    }
}

/// Solve `request` with every solver in order, one after another.
///
/// A solver that fails, or panics, contributes an entry carrying the error
/// and the run moves on to the next one.
pub fn run_benchmark<'a, I>(request: &SolveRequest, solvers: I) -> Vec<BenchmarkEntry>
where
    I: IntoIterator<Item = (SolverType, &'a dyn Solver)>,
{
    solvers
        .into_iter()
        .map(|(solver_type, solver)| run_one(request, solver_type, solver))
        .collect()
}

fn run_one(request: &SolveRequest, solver_type: SolverType, solver: &dyn Solver) -> BenchmarkEntry {
    let output = OutputBuffer::new();
    let sink = output.sink(solver.name());

    log::info!(
        "solving {} with {} (time limit {}s)",
        request.model.display(),
        solver.name(),
        request.time_limit
    );
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| solver.solve(request, sink)));

    let (record, error) = match outcome {
        Ok(Ok(telemetry)) => {
            let record = ResultRecord::from(telemetry);
            log::info!(
                "{} finished in {:.2}s: {}",
                record.solver,
                start.elapsed().as_secs_f64(),
                record.termination
            );
            (Some(record), None)
        }
        Ok(Err(e)) => {
            log::error!("{} failed: {}", solver.name(), e);
            (None, Some(e.to_string()))
        }
        Err(_) => {
            log::error!("{} panicked", solver.name());
            (None, Some(format!("{} panicked while solving", solver.name())))
        }
    };

    BenchmarkEntry {
        solver: solver_type,
        record,
        error,
        output: output.contents(),
    }
}
