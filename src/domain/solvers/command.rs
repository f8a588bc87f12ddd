//! Solvers driven as external programs.
//!
//! The program reads the model itself, prints its progress and final
//! statistics to stdout, and the transcript is parsed afterwards.

use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::{forward_lines, LineSink};
use crate::domain::solver::{RawTelemetry, SolveError, SolveRequest, Termination};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An external commandline solver
pub trait SolverProgram {
    /// Path or name of the executable
    fn program(&self) -> &Path;

    /// Commandline arguments solving `request`
    fn arguments(&self, request: &SolveRequest) -> Vec<OsString>;

    /// Turn the console transcript into telemetry
    fn parse_transcript(&self, transcript: &Transcript) -> Result<RawTelemetry, SolveError>;
}

/// Everything a finished solver process left behind
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub lines: Vec<String>,
    pub stderr: Vec<String>,
    pub elapsed: f64,
    /// The watchdog had to kill the process
    pub killed: bool,
}

impl Transcript {
    /// Build a transcript from literal console text
    pub fn from_text(text: &str) -> Self {
        Transcript {
            lines: text.lines().map(str::to_string).collect(),
            ..Transcript::default()
        }
    }
}

/// Launch `solver` on `request`, forwarding stdout to `sink` while it runs.
///
/// A process still alive `kill_grace` after its time limit is killed.
pub fn run_program<P: SolverProgram + ?Sized>(
    solver: &P,
    request: &SolveRequest,
    sink: LineSink,
    kill_grace: Duration,
) -> Result<RawTelemetry, SolveError> {
    if !request.model.is_file() {
        return Err(SolveError::ModelRead(format!(
            "{} does not exist",
            request.model.display()
        )));
    }

    let program = solver.program();
    let start = Instant::now();
    let mut child = Command::new(program)
        .args(solver.arguments(request))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SolveError::Launch {
            program: program.display().to_string(),
            source,
        })?;

    let stdout_reader = spawn_reader(child.stdout.take(), Some(sink));
    let stderr_reader = spawn_reader(child.stderr.take(), None);

    let deadline = start + Duration::from_secs(request.time_limit) + kill_grace;
    let killed = wait_with_deadline(&mut child, deadline, program)?;

    let transcript = Transcript {
        lines: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
        elapsed: start.elapsed().as_secs_f64(),
        killed,
    };
    for line in &transcript.stderr {
        log::warn!("{}: {}", program.display(), line);
    }

    match solver.parse_transcript(&transcript) {
        Ok(telemetry) => Ok(telemetry),
        Err(SolveError::Backend(_)) if transcript.killed => {
            let mut telemetry = RawTelemetry::new(
                program_label(program),
                format!("killed {}s after time limit", kill_grace.as_secs()),
                Termination::TimeLimit,
            );
            telemetry.time = transcript.elapsed;
            Ok(telemetry)
        }
        Err(e) => Err(e),
    }
}

fn spawn_reader<R>(source: Option<R>, sink: Option<LineSink>) -> Option<thread::JoinHandle<Vec<String>>>
where
    R: Read + Send + 'static,
{
    let source = source?;
    let handle = thread::spawn(move || {
        let mut sink = sink;
        let mut lines = Vec::new();
        forward_lines(source, &mut |line: &str| {
            if let Some(sink) = sink.as_mut() {
                sink(line);
            }
            lines.push(line.to_string());
        });
        lines
    });
    Some(handle)
}

fn join_reader(handle: Option<thread::JoinHandle<Vec<String>>>) -> Vec<String> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Returns whether the child had to be killed.
fn wait_with_deadline(child: &mut Child, deadline: Instant, program: &Path) -> Result<bool, SolveError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("{} exited with {}", program.display(), status);
                return Ok(false);
            }
            Ok(None) if Instant::now() >= deadline => {
                log::warn!("{} overran its time limit, killing it", program.display());
                child
                    .kill()
                    .and_then(|_| child.wait())
                    .map_err(|e| SolveError::Backend(format!("failed to stop {}: {}", program.display(), e)))?;
                return Ok(true);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(SolveError::Backend(format!(
                    "failed to wait for {}: {}",
                    program.display(),
                    e
                )))
            }
        }
    }
}

fn program_label(program: &Path) -> String {
    program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Value to the right of the first `key :` line, e.g. `Solving Nodes : 12`.
pub(crate) fn field<'a>(lines: &'a [String], key: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix(key)?;
        let value = rest.trim_start().strip_prefix(':')?;
        Some(value.trim())
    })
}

/// First whitespace separated token parsed as a number.
pub(crate) fn leading_number<T: std::str::FromStr>(value: &str) -> Option<T> {
    value.split_whitespace().next()?.parse().ok()
}
