use serde::{Deserialize, Serialize};

use crate::domain::solver_factory::SolverType;
use crate::domain::upload::StoredModel;

// ---------- API (wire) types ----------

#[derive(Deserialize)]
pub struct BenchmarkRequest {
    /// Name the model was uploaded under
    pub model: String,
    pub time_limit: u64,
    /// Solver names in the order they should run; all available when omitted
    pub solvers: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub model: StoredModel,
}

#[derive(Serialize)]
pub struct SolverInfo {
    pub name: &'static str,
    pub color: &'static str,
}

impl From<SolverType> for SolverInfo {
    fn from(solver: SolverType) -> Self {
        SolverInfo {
            name: solver.name(),
            color: solver.color(),
        }
    }
}

#[derive(Serialize)]
pub struct SolversResponse {
    pub solvers: Vec<SolverInfo>,
}
