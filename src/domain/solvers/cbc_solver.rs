use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::LineSink;
use crate::domain::solver::{RawTelemetry, SolveError, SolveRequest, Solver, Termination};
use crate::domain::solvers::command::{field, leading_number, run_program, SolverProgram, Transcript};

// Lines the CBC/Clp readers print when the model cannot be loaded.
const READ_FAILURES: [&str; 4] = [
    "Unable to open file",
    "Unknown image",
    "errors on input",
    "Unable to read",
];

/// COIN-OR CBC, driven through the `cbc` program
pub struct CbcSolver {
    program: PathBuf,
    kill_grace: Duration,
}

impl CbcSolver {
    pub fn new(program: impl Into<PathBuf>, kill_grace: Duration) -> Self {
        CbcSolver {
            program: program.into(),
            kill_grace,
        }
    }

    /// Map the `Result - ...` summary (MIP) or the Clp status line (LP)
    fn convert_status(status: &str) -> Termination {
        let status = status.trim();
        if status.starts_with("Optimal") {
            Termination::Optimal
        } else if status.contains("unbounded") || status.starts_with("Dual infeasible") {
            Termination::Unbounded
        } else if status.contains("infeasible") {
            Termination::Infeasible
        } else if status.contains("time limit") || status.starts_with("Stopped on time") {
            Termination::TimeLimit
        } else if status.contains("ctrl-c") || status.contains("event handler") {
            Termination::Interrupted
        } else {
            Termination::Unknown(status.to_string())
        }
    }

    fn version(lines: &[String]) -> Option<&str> {
        field(lines, "Version").and_then(|v| v.split_whitespace().next())
    }

    /// Clp prints e.g. `Optimal - objective value 28` for continuous models
    fn lp_status_line(lines: &[String]) -> Option<(&str, Option<f64>)> {
        const LP_STATUSES: [&str; 6] = [
            "Optimal - objective value",
            "Problem is infeasible",
            "Primal infeasible",
            "Dual infeasible",
            "Problem is unbounded",
            "Stopped on time",
        ];
        lines.iter().rev().find_map(|line| {
            let prefix = LP_STATUSES.iter().copied().find(|p| line.starts_with(p))?;
            let objective = line
                .split_once("objective value")
                .and_then(|(_, rest)| leading_number(rest));
            let status = prefix.split(" - ").next().unwrap_or(prefix);
            Some((status, objective))
        })
    }

    /// `Optimal objective 28 - 2 iterations time 0.002`
    fn lp_iterations(lines: &[String]) -> Option<u64> {
        lines.iter().rev().find_map(|line| {
            let (_, rest) = line.split_once(" - ")?;
            let (count, tail) = rest.split_once(' ')?;
            if tail.starts_with("iterations") {
                count.parse().ok()
            } else {
                None
            }
        })
    }
}

impl SolverProgram for CbcSolver {
    fn program(&self) -> &Path {
        &self.program
    }

    fn arguments(&self, request: &SolveRequest) -> Vec<OsString> {
        vec![
            request.model.clone().into_os_string(),
            "-sec".into(),
            request.time_limit.to_string().into(),
            "-solve".into(),
            "-quit".into(),
        ]
    }

    fn parse_transcript(&self, transcript: &Transcript) -> Result<RawTelemetry, SolveError> {
        let lines = &transcript.lines;
        let label = match Self::version(lines) {
            Some(version) => format!("CBC {}", version),
            None => "CBC".to_string(),
        };

        let mip_status = lines
            .iter()
            .find_map(|line| line.strip_prefix("Result - "))
            .map(str::trim);

        let mut telemetry = if let Some(status) = mip_status {
            let mut telemetry = RawTelemetry::new(label, status, Self::convert_status(status));
            let has_solution = !lines.iter().any(|l| l.starts_with("No feasible solution found"));
            if has_solution && telemetry.termination.may_have_solution() {
                telemetry.objective = field(lines, "Objective value").and_then(leading_number);
            }
            telemetry.gap = field(lines, "Gap").and_then(leading_number);
            telemetry.nodes = field(lines, "Enumerated nodes").and_then(leading_number);
            telemetry.iterations = field(lines, "Total iterations").and_then(leading_number);
            telemetry
        } else if let Some((status, objective)) = Self::lp_status_line(lines) {
            let mut telemetry = RawTelemetry::new(label, status, Self::convert_status(status));
            if telemetry.termination == Termination::Optimal {
                telemetry.objective = objective;
            }
            telemetry.iterations = Self::lp_iterations(lines);
            telemetry
        } else if let Some(failure) = lines
            .iter()
            .find(|line| READ_FAILURES.iter().any(|marker| line.contains(marker)))
        {
            return Err(SolveError::ModelRead(failure.trim().to_string()));
        } else {
            return Err(SolveError::Backend(
                "cbc finished without reporting a result".to_string(),
            ));
        };

        telemetry.time = field(lines, "Time (Wallclock seconds)")
            .and_then(leading_number)
            .unwrap_or(transcript.elapsed);
        Ok(telemetry)
    }
}

impl Solver for CbcSolver {
    fn solve(&self, request: &SolveRequest, sink: LineSink) -> Result<RawTelemetry, SolveError> {
        run_program(self, request, sink, self.kill_grace)
    }

    fn name(&self) -> &str {
        "CBC"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIP_OPTIMAL: &str = "\
Welcome to the CBC MILP Solver
Version: 2.10.11
Build Date: Jan  1 2024

command line - cbc knapsack.mps -sec 5 -solve -quit (default strategy 1)
At line 1 NAME          KNAPSACK
Continuous objective value is 30.5 - 0.00 seconds
Cgl0004I processed model has 1 rows, 3 columns (3 integer (3 of which binary)) and 3 elements
Search completed - best objective -28, took 2 iterations and 0 nodes (0.00 seconds)
Result - Optimal solution found

Objective value:                28.00000000
Enumerated nodes:               0
Total iterations:               2
Time (CPU seconds):             0.01
Time (Wallclock seconds):       0.02

Total time (CPU seconds):       0.01   (Wallclock seconds):       0.02
";

    const MIP_INFEASIBLE: &str = "\
Welcome to the CBC MILP Solver
Version: 2.10.11
Problem is infeasible - 0.00 seconds
Result - Problem proven infeasible

No feasible solution found
Enumerated nodes:               0
Total iterations:               0
Time (CPU seconds):             0.00
Time (Wallclock seconds):       0.00
";

    const MIP_TIME_LIMIT: &str = "\
Welcome to the CBC MILP Solver
Version: 2.10.11
Result - Stopped on time limit

Objective value:                1234.00000000
Lower bound:                    1200.000
Gap:                            0.03
Enumerated nodes:               9182
Total iterations:               401234
Time (CPU seconds):             5.01
Time (Wallclock seconds):       5.03
";

    const LP_OPTIMAL: &str = "\
Welcome to the CBC MILP Solver
Version: 2.10.11
Presolve 2 (0) rows, 2 (0) columns and 4 (0) elements
Optimal - objective value -464.75314
Optimal objective -464.7531429 - 7 iterations time 0.002
";

    fn cbc() -> CbcSolver {
        CbcSolver::new("cbc", Duration::from_secs(30))
    }

    fn parse(text: &str) -> Result<RawTelemetry, SolveError> {
        let mut transcript = Transcript::from_text(text);
        transcript.elapsed = 0.5;
        cbc().parse_transcript(&transcript)
    }

    #[test]
    fn test_arguments_pass_time_limit() {
        let args = cbc().arguments(&SolveRequest::new("uploads/model.mps", 7));
        let args: Vec<String> = args.into_iter().map(|a| a.into_string().unwrap()).collect();
        assert_eq!(args, vec!["uploads/model.mps", "-sec", "7", "-solve", "-quit"]);
    }

    #[test]
    fn test_parse_optimal_mip() {
        let telemetry = parse(MIP_OPTIMAL).unwrap();
        assert_eq!(telemetry.solver, "CBC 2.10.11");
        assert_eq!(telemetry.status, "Optimal solution found");
        assert_eq!(telemetry.termination, Termination::Optimal);
        assert_eq!(telemetry.objective, Some(28.0));
        assert_eq!(telemetry.nodes, Some(0));
        assert_eq!(telemetry.iterations, Some(2));
        assert_eq!(telemetry.gap, None);
        assert_eq!(telemetry.time, 0.02);
    }

    #[test]
    fn test_parse_infeasible_has_no_objective() {
        let telemetry = parse(MIP_INFEASIBLE).unwrap();
        assert_eq!(telemetry.status, "Problem proven infeasible");
        assert_eq!(telemetry.termination, Termination::Infeasible);
        assert_eq!(telemetry.objective, None);
    }

    #[test]
    fn test_parse_time_limit_keeps_incumbent_and_gap() {
        let telemetry = parse(MIP_TIME_LIMIT).unwrap();
        assert_eq!(telemetry.termination, Termination::TimeLimit);
        assert_eq!(telemetry.objective, Some(1234.0));
        assert_eq!(telemetry.gap, Some(0.03));
        assert_eq!(telemetry.nodes, Some(9182));
    }

    #[test]
    fn test_parse_continuous_model() {
        let telemetry = parse(LP_OPTIMAL).unwrap();
        assert_eq!(telemetry.status, "Optimal");
        assert_eq!(telemetry.termination, Termination::Optimal);
        assert_eq!(telemetry.objective, Some(-464.75314));
        assert_eq!(telemetry.iterations, Some(7));
        assert_eq!(telemetry.nodes, None);
        assert_eq!(telemetry.time, 0.5);
    }

    #[test]
    fn test_parse_unreadable_model_is_read_error() {
        let result = parse("Welcome to the CBC MILP Solver\nUnable to open file broken.mps\n");
        assert!(matches!(result, Err(SolveError::ModelRead(_))));
    }

    #[test]
    fn test_convert_status_vocabulary() {
        assert_eq!(CbcSolver::convert_status("Linear relaxation unbounded"), Termination::Unbounded);
        assert_eq!(CbcSolver::convert_status("Dual infeasible"), Termination::Unbounded);
        assert_eq!(CbcSolver::convert_status("Stopped on ctrl-c"), Termination::Interrupted);
        assert_eq!(
            CbcSolver::convert_status("Stopped on iteration limit"),
            Termination::Unknown("Stopped on iteration limit".to_string())
        );
    }
}
