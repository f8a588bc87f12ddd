use serde::{Serialize, Serializer};

use crate::config::Config;
use crate::domain::solver::Solver;
use crate::domain::solvers::{CbcSolver, ScipSolver};

#[cfg(feature = "highs-solver")]
use crate::domain::solvers::HighsSolver;

#[cfg(feature = "gurobi-solver")]
use crate::domain::solvers::GurobiSolver;

/// Available solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverType {
    #[cfg(feature = "gurobi-solver")]
    Gurobi,
    #[cfg(feature = "highs-solver")]
    Highs,
    Scip,
    Cbc,
}

impl SolverType {
    /// Parse solver type from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "gurobi-solver")]
            "gurobi" => Some(SolverType::Gurobi),
            #[cfg(feature = "highs-solver")]
            "highs" => Some(SolverType::Highs),
            "scip" => Some(SolverType::Scip),
            "cbc" => Some(SolverType::Cbc),
            _ => None,
        }
    }

    /// Every solver compiled into this build, in default selection order
    pub fn all() -> Vec<SolverType> {
        let mut solvers = Vec::new();
        #[cfg(feature = "gurobi-solver")]
        solvers.push(SolverType::Gurobi);
        #[cfg(feature = "highs-solver")]
        solvers.push(SolverType::Highs);
        solvers.push(SolverType::Scip);
        solvers.push(SolverType::Cbc);
        solvers
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "gurobi-solver")]
            SolverType::Gurobi => "Gurobi",
            #[cfg(feature = "highs-solver")]
            SolverType::Highs => "HiGHS",
            SolverType::Scip => "SCIP",
            SolverType::Cbc => "CBC",
        }
    }

    /// Fixed chart color per solver identity
    pub fn color(&self) -> &'static str {
        match self {
            #[cfg(feature = "gurobi-solver")]
            SolverType::Gurobi => "#DD2113",
            #[cfg(feature = "highs-solver")]
            SolverType::Highs => "green",
            SolverType::Scip => "#1E3AC5",
            SolverType::Cbc => "#004746",
        }
    }
}

impl Serialize for SolverType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Create a solver instance based on the specified type
pub fn create_solver(solver_type: SolverType, config: &Config) -> Box<dyn Solver> {
    match solver_type {
        #[cfg(feature = "gurobi-solver")]
        SolverType::Gurobi => Box::new(GurobiSolver::new()),
        #[cfg(feature = "highs-solver")]
        SolverType::Highs => Box::new(HighsSolver::new(&config.highs_log_file)),
        SolverType::Scip => Box::new(ScipSolver::new(&config.scip_path, config.kill_grace)),
        SolverType::Cbc => Box::new(CbcSolver::new(&config.cbc_path, config.kill_grace)),
    }
}
