use std::ffi::{c_void, CString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::{const_mutex, Mutex};

use crate::capture::LineSink;
use crate::domain::solver::{RawTelemetry, SolveError, SolveRequest, Solver, Termination};

use highs_sys::HighsInt;

const STATUS_ERROR: HighsInt = -1;

// The log file path is shared by every HiGHS run in this process.
static LOG_FILE_LOCK: Mutex<()> = const_mutex(());

/// Owned `Highs` instance from the C API
struct Highs {
    ptr: *mut c_void,
}

impl Highs {
    fn new() -> Result<Self, SolveError> {
        let ptr = unsafe { highs_sys::Highs_create() };
        if ptr.is_null() {
            return Err(SolveError::Configure("failed to create HiGHS instance".to_string()));
        }
        Ok(Highs { ptr })
    }

    fn read_model(&mut self, path: &str) -> Result<(), SolveError> {
        let path_c = c_string(path)?;
        let status = unsafe { highs_sys::Highs_readModel(self.ptr, path_c.as_ptr()) };
        if status == STATUS_ERROR {
            return Err(SolveError::ModelRead(format!("HiGHS could not read {}", path)));
        }
        Ok(())
    }

    fn set_bool_option(&mut self, option: &str, value: bool) -> Result<(), SolveError> {
        let option_c = c_string(option)?;
        let status =
            unsafe { highs_sys::Highs_setBoolOptionValue(self.ptr, option_c.as_ptr(), HighsInt::from(value)) };
        check_option(status, option)
    }

    fn set_double_option(&mut self, option: &str, value: f64) -> Result<(), SolveError> {
        let option_c = c_string(option)?;
        let status = unsafe { highs_sys::Highs_setDoubleOptionValue(self.ptr, option_c.as_ptr(), value) };
        check_option(status, option)
    }

    fn set_string_option(&mut self, option: &str, value: &str) -> Result<(), SolveError> {
        let option_c = c_string(option)?;
        let value_c = c_string(value)?;
        let status = unsafe {
            highs_sys::Highs_setStringOptionValue(self.ptr, option_c.as_ptr(), value_c.as_ptr())
        };
        check_option(status, option)
    }

    fn run(&mut self) -> Result<(), SolveError> {
        let status = unsafe { highs_sys::Highs_run(self.ptr) };
        if status == STATUS_ERROR {
            log::warn!("Highs_run returned an error status");
        }
        Ok(())
    }

    fn model_status(&self) -> HighsInt {
        unsafe { highs_sys::Highs_getModelStatus(self.ptr) }
    }

    fn run_time(&self) -> f64 {
        unsafe { highs_sys::Highs_getRunTime(self.ptr) }
    }

    fn int_info(&self, info: &str) -> Option<HighsInt> {
        let info_c = CString::new(info).ok()?;
        let mut value: HighsInt = 0;
        let status = unsafe { highs_sys::Highs_getIntInfoValue(self.ptr, info_c.as_ptr(), &mut value) };
        info_value(status, value, info)
    }

    fn int64_info(&self, info: &str) -> Option<i64> {
        let info_c = CString::new(info).ok()?;
        let mut value: i64 = 0;
        let status = unsafe { highs_sys::Highs_getInt64InfoValue(self.ptr, info_c.as_ptr(), &mut value) };
        info_value(status, value, info)
    }

    fn double_info(&self, info: &str) -> Option<f64> {
        let info_c = CString::new(info).ok()?;
        let mut value: f64 = 0.0;
        let status = unsafe { highs_sys::Highs_getDoubleInfoValue(self.ptr, info_c.as_ptr(), &mut value) };
        info_value(status, value, info)
    }
}

impl Drop for Highs {
    fn drop(&mut self) {
        unsafe { highs_sys::Highs_destroy(self.ptr) }
    }
}

fn c_string(value: &str) -> Result<CString, SolveError> {
    CString::new(value).map_err(|_| SolveError::Configure(format!("{:?} contains a NUL byte", value)))
}

fn check_option(status: HighsInt, option: &str) -> Result<(), SolveError> {
    if status == STATUS_ERROR {
        return Err(SolveError::Configure(format!("failed to set HiGHS option {}", option)));
    }
    Ok(())
}

fn info_value<T>(status: HighsInt, value: T, info: &str) -> Option<T> {
    if status == STATUS_ERROR {
        log::debug!("HiGHS info {} unavailable", info);
        return None;
    }
    Some(value)
}

/// HiGHS solver implementation, reading the model through the C API.
///
/// HiGHS writes its log to a file in the working directory instead of the
/// console; the file is removed before each run and replayed into the sink
/// afterwards.
pub struct HighsSolver {
    log_file: PathBuf,
}

impl HighsSolver {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        HighsSolver {
            log_file: log_file.into(),
        }
    }

    /// Label for a raw `HighsModelStatus` code, as `Highs::modelStatusToString` spells it
    fn status_label(code: HighsInt) -> String {
        let label = match code {
            0 => "Not Set",
            1 => "Load error",
            2 => "Model error",
            3 => "Presolve error",
            4 => "Solve error",
            5 => "Postsolve error",
            6 => "Empty",
            7 => "Optimal",
            8 => "Infeasible",
            9 => "Primal infeasible or unbounded",
            10 => "Unbounded",
            11 => "Bound on objective reached",
            12 => "Target for objective reached",
            13 => "Time limit reached",
            14 => "Iteration limit reached",
            15 => "Unknown",
            16 => "Solution limit reached",
            17 => "Interrupted by user",
            _ => return format!("Unrecognised HiGHS model status {}", code),
        };
        label.to_string()
    }

    /// Convert a raw HiGHS model status code to our termination
    fn convert_status(code: HighsInt, label: &str) -> Termination {
        match code {
            7 => Termination::Optimal,
            8 => Termination::Infeasible,
            10 => Termination::Unbounded,
            13 => Termination::TimeLimit,
            17 => Termination::Interrupted,
            _ => Termination::Unknown(label.to_string()),
        }
    }

    fn version() -> String {
        let (major, minor, patch) = unsafe {
            (
                highs_sys::Highs_versionMajor(),
                highs_sys::Highs_versionMinor(),
                highs_sys::Highs_versionPatch(),
            )
        };
        format!("HiGHS {}.{}.{}", major, minor, patch)
    }

    fn remove_log_file(&self) -> Result<(), SolveError> {
        match fs::remove_file(&self.log_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SolveError::Configure(format!(
                "failed to remove {}: {}",
                self.log_file.display(),
                e
            ))),
        }
    }

    fn replay_log(log_file: &Path, sink: &mut LineSink) {
        match fs::read_to_string(log_file) {
            Ok(text) => text.lines().for_each(|line| sink(line)),
            Err(e) => log::warn!("failed to read HiGHS log {}: {}", log_file.display(), e),
        }
    }
}

impl Solver for HighsSolver {
    fn solve(&self, request: &SolveRequest, mut sink: LineSink) -> Result<RawTelemetry, SolveError> {
        let path = request.model_str()?;
        let log_file = self
            .log_file
            .to_str()
            .ok_or_else(|| SolveError::Configure("HiGHS log file path is not UTF-8".to_string()))?;

        let _log_guard = LOG_FILE_LOCK.lock();
        self.remove_log_file()?;

        let mut highs = Highs::new()?;
        // Console output would land in whatever stdout capture is active
        highs.set_bool_option("log_to_console", false)?;
        highs.set_string_option("log_file", log_file)?;
        highs.set_double_option("time_limit", request.time_limit as f64)?;

        let outcome = highs.read_model(path).and_then(|_| highs.run());
        Self::replay_log(&self.log_file, &mut sink);
        outcome?;

        let code = highs.model_status();
        let label = Self::status_label(code);
        let mut telemetry = RawTelemetry::new(Self::version(), label.clone(), Self::convert_status(code, &label));

        telemetry.time = highs.run_time();
        telemetry.iterations = highs
            .int_info("simplex_iteration_count")
            .and_then(|v| u64::try_from(v).ok());
        // MIP-only entries read as -1 for continuous models
        telemetry.nodes = highs
            .int64_info("mip_node_count")
            .and_then(|v| u64::try_from(v).ok());
        telemetry.gap = highs.double_info("mip_gap");

        // 2 == kHighsSolutionStatusFeasible
        if highs.int_info("primal_solution_status") == Some(2) {
            telemetry.objective = highs.double_info("objective_function_value");
        }

        Ok(telemetry)
    }

    fn name(&self) -> &str {
        "HiGHS"
    }
}
