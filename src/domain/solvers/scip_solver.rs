use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::LineSink;
use crate::domain::solver::{RawTelemetry, SolveError, SolveRequest, Solver, Termination};
use crate::domain::solvers::command::{field, leading_number, run_program, SolverProgram, Transcript};

// Rows of the `LP` statistics table that count simplex/barrier iterations.
const LP_ITERATION_ROWS: [&str; 4] = ["primal LP", "dual LP", "lex dual LP", "barrier LP"];

/// SCIP, driven through the interactive shell of the `scip` program
pub struct ScipSolver {
    program: PathBuf,
    kill_grace: Duration,
}

impl ScipSolver {
    pub fn new(program: impl Into<PathBuf>, kill_grace: Duration) -> Self {
        ScipSolver {
            program: program.into(),
            kill_grace,
        }
    }

    /// SCIP reports e.g. `problem is solved [optimal solution found]`
    fn convert_status(status: &str) -> Termination {
        let reason = status
            .split_once('[')
            .and_then(|(_, rest)| rest.split_once(']'))
            .map(|(reason, _)| reason)
            .unwrap_or(status);

        match reason {
            "optimal solution found" => Termination::Optimal,
            "infeasible" => Termination::Infeasible,
            "unbounded" => Termination::Unbounded,
            "time limit reached" => Termination::TimeLimit,
            "user interrupt" | "terminate" => Termination::Interrupted,
            _ => Termination::Unknown(status.to_string()),
        }
    }

    fn version(lines: &[String]) -> Option<&str> {
        lines
            .iter()
            .find_map(|line| line.strip_prefix("SCIP version "))
            .and_then(|rest| rest.split_whitespace().next())
    }

    /// `+2.80000000000000e+01 (2 solutions)`; no solutions means no objective
    fn primal_bound(value: &str) -> Option<f64> {
        let solutions = value
            .split_once('(')
            .and_then(|(_, rest)| leading_number::<u64>(rest));
        match solutions {
            Some(0) => None,
            _ => leading_number(value),
        }
    }

    /// `0.00 %` as a fraction; `infinite` has no value
    fn gap(value: &str) -> Option<f64> {
        let percent: f64 = leading_number(value)?;
        Some(percent / 100.0)
    }

    /// Sum of the iteration column over the LP rows of `display statistics`
    fn lp_iterations(lines: &[String]) -> Option<u64> {
        let counts: Vec<u64> = lines
            .iter()
            .filter_map(|line| {
                let (row, values) = line.split_once(':')?;
                if !LP_ITERATION_ROWS.contains(&row.trim()) {
                    return None;
                }
                // Time, Calls, Iterations, ...
                values.split_whitespace().nth(2)?.parse().ok()
            })
            .collect();

        if counts.is_empty() {
            None
        } else {
            Some(counts.iter().sum())
        }
    }

    fn read_failure(lines: &[String]) -> Option<&String> {
        lines.iter().find(|line| {
            line.contains("error reading file")
                || (line.starts_with("file <") && line.contains("not found"))
        })
    }
}

impl SolverProgram for ScipSolver {
    fn program(&self) -> &Path {
        &self.program
    }

    fn arguments(&self, request: &SolveRequest) -> Vec<OsString> {
        let commands = format!(
            "read {} set limits time {} optimize display statistics quit",
            request.model.display(),
            request.time_limit
        );
        vec!["-c".into(), commands.into()]
    }

    fn parse_transcript(&self, transcript: &Transcript) -> Result<RawTelemetry, SolveError> {
        let lines = &transcript.lines;

        if let Some(failure) = Self::read_failure(lines) {
            return Err(SolveError::ModelRead(failure.trim().to_string()));
        }

        let status = field(lines, "SCIP Status").ok_or_else(|| {
            SolveError::Backend("scip finished without reporting a status".to_string())
        })?;

        let label = match Self::version(lines) {
            Some(version) => format!("SCIP {}", version),
            None => "SCIP".to_string(),
        };

        let mut telemetry = RawTelemetry::new(label, status, Self::convert_status(status));
        telemetry.time = field(lines, "Solving Time (sec)")
            .and_then(leading_number)
            .unwrap_or(transcript.elapsed);
        telemetry.nodes = field(lines, "Solving Nodes").and_then(leading_number);
        telemetry.gap = field(lines, "Gap").and_then(Self::gap);
        telemetry.iterations = Self::lp_iterations(lines);
        if telemetry.termination.may_have_solution() {
            telemetry.objective = field(lines, "Primal Bound").and_then(Self::primal_bound);
        }
        Ok(telemetry)
    }
}

impl Solver for ScipSolver {
    fn solve(&self, request: &SolveRequest, sink: LineSink) -> Result<RawTelemetry, SolveError> {
        run_program(self, request, sink, self.kill_grace)
    }

    fn name(&self) -> &str {
        "SCIP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIMAL: &str = "\
SCIP version 9.1.0 [precision: 8 byte] [memory: block] [mode: optimized] [LP solver: Soplex 7.1.0]
Copyright (c) 2002-2024 Zuse Institute Berlin (ZIB)

SCIP> read knapsack.mps
read problem <knapsack.mps>
============

original problem has 3 variables (3 bin, 0 int, 0 impl, 0 cont) and 1 constraints

SCIP Status        : problem is solved [optimal solution found]
Solving Time (sec) : 0.01
Solving Nodes      : 1
Primal Bound       : +2.80000000000000e+01 (2 solutions)
Dual Bound         : +2.80000000000000e+01
Gap                : 0.00 %

SCIP> display statistics
SCIP Status        : problem is solved [optimal solution found]
Total Time         :       0.01
LP                 :       Time      Calls Iterations  Iter/call   Iter/sec  Time-0-It Calls-0-It    ItLimit
  primal LP        :       0.00          2          1       0.50       0.00       0.00          1
  dual LP          :       0.00          1          3       3.00       0.00       0.00          0
  lex dual LP      :       0.00          0          0       0.00          -
  barrier LP       :       0.00          0          0       0.00          -       0.00          0
  resolve instable :       0.00          0          0       0.00          -
  diving/probing LP:       0.00          0          0       0.00          -
Solution           :
  Solutions found  :          2 (2 improvements)
  Gap              :       0.00 %
";

    const INFEASIBLE: &str = "\
SCIP version 9.1.0 [precision: 8 byte]
SCIP Status        : problem is solved [infeasible]
Solving Time (sec) : 0.00
Solving Nodes      : 0
Primal Bound       : +1.00000000000000e+20 (0 solutions)
Dual Bound         : +1.00000000000000e+20
Gap                : 0.00 %
";

    const TIME_LIMIT_NO_SOLUTION: &str = "\
SCIP version 9.1.0 [precision: 8 byte]
SCIP Status        : solving was interrupted [time limit reached]
Solving Time (sec) : 5.00
Solving Nodes      : 4211 (total of 4260 nodes in 2 runs)
Primal Bound       : +1.00000000000000e+20 (0 solutions)
Dual Bound         : +1.02300000000000e+03
Gap                : infinite
";

    fn scip() -> ScipSolver {
        ScipSolver::new("scip", Duration::from_secs(30))
    }

    fn parse(text: &str) -> Result<RawTelemetry, SolveError> {
        scip().parse_transcript(&Transcript::from_text(text))
    }

    #[test]
    fn test_arguments_build_one_command_string() {
        let args = scip().arguments(&SolveRequest::new("uploads/model.lp", 12));
        assert_eq!(args[0], "-c");
        assert_eq!(
            args[1],
            "read uploads/model.lp set limits time 12 optimize display statistics quit"
        );
    }

    #[test]
    fn test_parse_optimal() {
        let telemetry = parse(OPTIMAL).unwrap();
        assert_eq!(telemetry.solver, "SCIP 9.1.0");
        assert_eq!(telemetry.status, "problem is solved [optimal solution found]");
        assert_eq!(telemetry.termination, Termination::Optimal);
        assert_eq!(telemetry.objective, Some(28.0));
        assert_eq!(telemetry.nodes, Some(1));
        assert_eq!(telemetry.gap, Some(0.0));
        assert_eq!(telemetry.iterations, Some(4));
        assert_eq!(telemetry.time, 0.01);
    }

    #[test]
    fn test_parse_infeasible_has_no_objective_but_zero_nodes() {
        let telemetry = parse(INFEASIBLE).unwrap();
        assert_eq!(telemetry.termination, Termination::Infeasible);
        assert_eq!(telemetry.objective, None);
        assert_eq!(telemetry.nodes, Some(0));
        // no statistics were displayed
        assert_eq!(telemetry.iterations, None);
    }

    #[test]
    fn test_parse_time_limit_without_incumbent() {
        let telemetry = parse(TIME_LIMIT_NO_SOLUTION).unwrap();
        assert_eq!(telemetry.termination, Termination::TimeLimit);
        assert_eq!(telemetry.objective, None);
        assert_eq!(telemetry.gap, None);
        assert_eq!(telemetry.nodes, Some(4211));
    }

    #[test]
    fn test_parse_missing_file_is_read_error() {
        let result = parse("SCIP version 9.1.0\nfile <nothing.mps> not found\nerror reading file <nothing.mps>\n");
        assert!(matches!(result, Err(SolveError::ModelRead(_))));
    }

    #[test]
    fn test_parse_without_status_is_backend_error() {
        assert!(matches!(parse("SCIP version 9.1.0\n"), Err(SolveError::Backend(_))));
    }

    #[test]
    fn test_convert_status_keeps_unmapped_label() {
        assert_eq!(
            ScipSolver::convert_status("solving was interrupted [user interrupt]"),
            Termination::Interrupted
        );
        assert_eq!(
            ScipSolver::convert_status("solving was interrupted [node limit reached]"),
            Termination::Unknown("solving was interrupted [node limit reached]".to_string())
        );
    }
}
