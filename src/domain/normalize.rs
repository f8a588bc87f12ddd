use serde::Serialize;

use crate::domain::solver::{RawTelemetry, Termination};

/// Backend-agnostic result of one solve.
///
/// `None` means the backend produced no trustworthy value for this solve:
/// it does not report the metric, had nothing to report (no incumbent, no
/// bound) or failed when asked. It is never the same thing as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub solver: String,
    pub time: f64,
    pub iterations: Option<u64>,
    pub nodes: Option<u64>,
    pub gap: Option<f64>,
    pub objective: Option<f64>,
    pub status: String,
    pub termination: Termination,
}

impl From<RawTelemetry> for ResultRecord {
    fn from(raw: RawTelemetry) -> Self {
        ResultRecord {
            solver: raw.solver,
            time: if raw.time.is_finite() { raw.time.max(0.0) } else { 0.0 },
            iterations: raw.iterations,
            nodes: raw.nodes,
            gap: raw.gap.filter(|g| g.is_finite()),
            objective: raw.objective.filter(|o| o.is_finite()),
            status: raw.status,
            termination: raw.termination,
        }
    }
}
