#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use solver_bench::config::Config;
use tempfile::TempDir;

/// Stands in for the `cbc` program; the model's contents pick the transcript.
/// SLOW models ignore the time limit and have to be killed.
pub const FAKE_CBC: &str = r#"#!/bin/sh
echo "Welcome to the CBC MILP Solver"
echo "Version: 2.10.11"
echo "command line - cbc $*"
if grep -q INFEASIBLE "$1"; then
cat <<'TRANSCRIPT'
Result - Problem proven infeasible

No feasible solution found
Enumerated nodes:               0
Total iterations:               0
Time (Wallclock seconds):       0.00
TRANSCRIPT
elif grep -q SLOW "$1"; then
exec sleep 30
else
cat <<'TRANSCRIPT'
Result - Optimal solution found

Objective value:                28.00000000
Enumerated nodes:               0
Total iterations:               2
Time (Wallclock seconds):       0.02
TRANSCRIPT
fi
"#;

/// Stands in for the `scip` program. SLOW models stop at the time limit.
pub const FAKE_SCIP: &str = r#"#!/bin/sh
set -- $2
model=$2
echo "SCIP version 9.1.0 [precision: 8 byte] [memory: block]"
if [ ! -r "$model" ]; then
  echo "file <$model> not found"
  exit 1
fi
if grep -q INFEASIBLE "$model"; then
cat <<'TRANSCRIPT'
SCIP Status        : problem is solved [infeasible]
Solving Time (sec) : 0.00
Solving Nodes      : 0
Primal Bound       : +1.00000000000000e+20 (0 solutions)
Dual Bound         : +1.00000000000000e+20
Gap                : 0.00 %
TRANSCRIPT
elif grep -q SLOW "$model"; then
cat <<'TRANSCRIPT'
SCIP Status        : solving was interrupted [time limit reached]
Solving Time (sec) : 1.00
Solving Nodes      : 4211
Primal Bound       : +3.00000000000000e+01 (1 solutions)
Dual Bound         : +2.80000000000000e+01
Gap                : 7.14 %
TRANSCRIPT
else
cat <<'TRANSCRIPT'
SCIP Status        : problem is solved [optimal solution found]
Solving Time (sec) : 0.01
Solving Nodes      : 1
Primal Bound       : +2.80000000000000e+01 (2 solutions)
Dual Bound         : +2.80000000000000e+01
Gap                : 0.00 %
LP                 :       Time      Calls Iterations  Iter/call   Iter/sec  Time-0-It Calls-0-It    ItLimit
  primal LP        :       0.00          2          1       0.50       0.00       0.00          1
  dual LP          :       0.00          1          3       3.00       0.00       0.00          0
TRANSCRIPT
fi
"#;

pub const OPTIMAL_MODEL: &str = "NAME          KNAPSACK\nROWS\n L  C1\nENDATA\n";
pub const INFEASIBLE_MODEL: &str = "NAME          INFEASIBLE\nROWS\n L  C1\nENDATA\n";
pub const SLOW_MODEL: &str = "NAME          SLOW\nROWS\n L  C1\nENDATA\n";

/// Scratch directory holding fake solver programs and uploads, removed on drop
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new(tag: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("solver-bench-{}-", tag))
            .tempdir()
            .expect("Failed to create fixture directory");
        let fixture = Fixture { dir };
        fixture.script("cbc", FAKE_CBC);
        fixture.script("scip", FAKE_SCIP);
        fixture
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, body).expect("Failed to write fake solver");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod fake solver");
        path
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.path("uploads")
    }

    pub fn config(&self) -> Config {
        Config {
            upload_dir: self.upload_dir(),
            cbc_path: self.path("cbc"),
            scip_path: self.path("scip"),
            highs_log_file: self.path("highs.log"),
            kill_grace: Duration::from_secs(1),
            ..Config::default()
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
