use std::collections::HashSet;

use thiserror::Error;

use crate::domain::solver_factory::SolverType;

pub const MIN_TIME_LIMIT: u64 = 1;
pub const MAX_TIME_LIMIT: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveInputError {
    #[error("time limit must be between 1 and 60 seconds, got {0}")]
    TimeLimit(u64),

    #[error("unknown solver {0:?}")]
    UnknownSolver(String),

    #[error("solver {0} selected more than once")]
    DuplicateSolver(&'static str),

    #[error("select at least one solver")]
    NoSolvers,
}

pub fn validate_time_limit(time_limit: u64) -> Result<u64, SolveInputError> {
    if (MIN_TIME_LIMIT..=MAX_TIME_LIMIT).contains(&time_limit) {
        Ok(time_limit)
    } else {
        Err(SolveInputError::TimeLimit(time_limit))
    }
}

/// Resolve the selected solver names, keeping selection order.
/// No selection at all means every available solver.
pub fn validate_solvers(names: Option<&[String]>) -> Result<Vec<SolverType>, SolveInputError> {
    let names = match names {
        Some(names) => names,
        None => return Ok(SolverType::all()),
    };
    if names.is_empty() {
        return Err(SolveInputError::NoSolvers);
    }

    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let solver = SolverType::from_str(name.trim())
            .ok_or_else(|| SolveInputError::UnknownSolver(name.clone()))?;
        if !seen.insert(solver) {
            return Err(SolveInputError::DuplicateSolver(solver.name()));
        }
        selected.push(solver);
    }

    Ok(selected)
}
