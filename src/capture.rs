//! Interception of solver console output.
//!
//! In-process backends print their progress straight to file descriptor 1.
//! [`StdoutCapture`] swaps that descriptor for a pipe for as long as the guard
//! lives and forwards everything read from the pipe, line by line, to a
//! [`LineSink`]. Dropping the guard puts the original descriptor back, which
//! also happens while unwinding from a panic inside the captured region.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::io::{FromRawFd, RawFd};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{const_mutex, Mutex, MutexGuard};

/// Receiver for captured console lines, without the trailing newline.
///
/// A sink must never write to stdout itself.
pub type LineSink = Box<dyn FnMut(&str) + Send>;

// fd 1 is process-global, so only one redirection may exist at a time.
static REDIRECT_LOCK: Mutex<()> = const_mutex(());

/// Scoped redirection of the process's standard output into a [`LineSink`].
pub struct StdoutCapture {
    saved: RawFd,
    reader: Option<JoinHandle<()>>,
    _lock: MutexGuard<'static, ()>,
}

impl StdoutCapture {
    pub fn begin(sink: LineSink) -> io::Result<Self> {
        let lock = REDIRECT_LOCK.lock();
        flush_stdout();

        let (read_fd, write_fd) = cloexec_pipe()?;

        // Solver programs spawned meanwhile must not inherit these
        let saved = unsafe { libc::fcntl(libc::STDOUT_FILENO, libc::F_DUPFD_CLOEXEC, 0) };
        if saved < 0 {
            let err = io::Error::last_os_error();
            close_all(&[read_fd, write_fd]);
            return Err(err);
        }

        if unsafe { libc::dup2(write_fd, libc::STDOUT_FILENO) } < 0 {
            let err = io::Error::last_os_error();
            close_all(&[read_fd, write_fd, saved]);
            return Err(err);
        }
        // fd 1 is now the only write end, so restoring it ends the reader.
        close_all(&[write_fd]);

        let pipe = unsafe { File::from_raw_fd(read_fd) };
        let reader = std::thread::Builder::new()
            .name("stdout-capture".to_string())
            .spawn(move || {
                let mut sink = sink;
                forward_lines(pipe, &mut sink);
            });

        match reader {
            Ok(handle) => Ok(StdoutCapture {
                saved,
                reader: Some(handle),
                _lock: lock,
            }),
            Err(err) => {
                restore(saved);
                Err(err)
            }
        }
    }
}

impl Drop for StdoutCapture {
    fn drop(&mut self) {
        flush_stdout();
        restore(self.saved);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                log::warn!("stdout capture reader panicked; some output may be missing");
            }
        }
    }
}

/// Run `f` with standard output forwarded to `sink`.
///
/// Standard output is restored when this returns, whether `f` returned an
/// error value or panicked.
pub fn with_captured_stdout<T, F>(sink: LineSink, f: F) -> io::Result<T>
where
    F: FnOnce() -> T,
{
    let _capture = StdoutCapture::begin(sink)?;
    Ok(f())
}

/// Read `source` until EOF and hand every line to `sink`.
///
/// A final line without a terminating newline is still forwarded.
pub fn forward_lines<R: Read>(source: R, sink: &mut dyn FnMut(&str)) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                sink(line.trim_end_matches(['\n', '\r']));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("stopped reading solver output: {}", e);
                break;
            }
        }
    }
}

/// Accumulated console output of one solver, mirrored live to the log.
#[derive(Clone, Default)]
pub struct OutputBuffer {
    text: Arc<Mutex<String>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    /// A sink appending to this buffer and logging each line under the
    /// `solver_output` target.
    pub fn sink(&self, solver: &str) -> LineSink {
        let text = Arc::clone(&self.text);
        let solver = solver.to_string();
        Box::new(move |line: &str| {
            log::info!(target: "solver_output", "[{}] {}", solver, line);
            let mut text = text.lock();
            text.push_str(line);
            text.push('\n');
        })
    }

    pub fn contents(&self) -> String {
        self.text.lock().clone()
    }
}

fn flush_stdout() {
    let _ = io::stdout().flush();
    // Backends print through C stdio, which buffers separately.
    unsafe {
        libc::fflush(std::ptr::null_mut());
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
fn cloexec_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

// No pipe2 here; the flag is set right after creation.
#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd")))]
fn cloexec_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    for &fd in &fds {
        if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } != 0 {
            let err = io::Error::last_os_error();
            close_all(&fds);
            return Err(err);
        }
    }
    Ok((fds[0], fds[1]))
}

fn restore(saved: RawFd) {
    unsafe {
        if libc::dup2(saved, libc::STDOUT_FILENO) < 0 {
            log::error!("failed to restore stdout: {}", io::Error::last_os_error());
        }
        libc::close(saved);
    }
}

fn close_all(fds: &[RawFd]) {
    for &fd in fds {
        unsafe {
            libc::close(fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    // libtest may print its own progress to fd 1 while a region is active,
    // so assertions only look at lines carrying the test's marker.
    fn collecting_sink(marker: &'static str) -> (LineSink, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let collected = Arc::clone(&lines);
        let sink: LineSink = Box::new(move |line: &str| {
            if line.starts_with(marker) {
                collected.lock().push(line.to_string());
            }
        });
        (sink, lines)
    }

    fn stdout_identity() -> (u64, u64) {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::fstat(libc::STDOUT_FILENO, &mut stat) };
        assert_eq!(rc, 0);
        (stat.st_dev as u64, stat.st_ino as u64)
    }

    fn write_stdout(line: &str) {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line).unwrap();
        out.flush().unwrap();
    }

    #[test]
    fn test_capture_forwards_three_lines_in_order() {
        let before = stdout_identity();
        let (sink, lines) = collecting_sink("ordered:");

        let value = with_captured_stdout(sink, || {
            write_stdout("ordered: one");
            write_stdout("ordered: two");
            write_stdout("ordered: three");
            42
        })
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(
            *lines.lock(),
            vec!["ordered: one", "ordered: two", "ordered: three"]
        );
        assert_eq!(stdout_identity(), before);
    }

    #[test]
    fn test_capture_restores_stdout_when_region_returns_error() {
        let before = stdout_identity();
        let (sink, lines) = collecting_sink("failing:");

        let result: io::Result<Result<(), String>> = with_captured_stdout(sink, || {
            write_stdout("failing: before error");
            Err("model read failed".to_string())
        });

        assert_eq!(result.unwrap(), Err("model read failed".to_string()));
        assert_eq!(*lines.lock(), vec!["failing: before error"]);
        assert_eq!(stdout_identity(), before);
    }

    #[test]
    fn test_capture_restores_stdout_when_region_panics() {
        let before = stdout_identity();
        let (sink, lines) = collecting_sink("panicking:");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            with_captured_stdout(sink, || {
                write_stdout("panicking: last words");
                panic!("backend blew up");
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(*lines.lock(), vec!["panicking: last words"]);
        assert_eq!(stdout_identity(), before);
    }

    fn is_cloexec(fd: RawFd) -> bool {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert!(flags >= 0);
        flags & libc::FD_CLOEXEC != 0
    }

    #[test]
    fn test_capture_descriptors_are_not_inherited_by_children() {
        let (read_fd, write_fd) = cloexec_pipe().unwrap();
        assert!(is_cloexec(read_fd));
        assert!(is_cloexec(write_fd));
        close_all(&[read_fd, write_fd]);

        let (sink, _) = collecting_sink("cloexec:");
        let capture = StdoutCapture::begin(sink).unwrap();
        assert!(is_cloexec(capture.saved));
        drop(capture);
    }

    #[test]
    fn test_forward_lines_keeps_trailing_partial_line() {
        let mut seen = Vec::new();
        forward_lines(&b"alpha\r\nbeta\ngamma"[..], &mut |line: &str| {
            seen.push(line.to_string())
        });
        assert_eq!(seen, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_output_buffer_accumulates_lines() {
        let buffer = OutputBuffer::new();
        let mut sink = buffer.sink("CBC");
        sink("Welcome to the CBC MILP Solver");
        sink("Result - Optimal solution found");
        assert_eq!(
            buffer.contents(),
            "Welcome to the CBC MILP Solver\nResult - Optimal solution found\n"
        );
    }
}
