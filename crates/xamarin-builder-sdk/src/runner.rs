//! Diagnostic process runner with hang detection.
//!
//! Build tools occasionally stop making progress without exiting (mdtool is
//! known to hang while loading projects). [`run_diagnostic`] runs a command,
//! echoes its standard output and watches it for a liveness pattern:
//!
//! 1. A hang timer is armed when the process starts.
//! 2. Every output line stops the timer; it is re-armed only when the line
//!    contains the liveness pattern.
//! 3. When the hang timer fires the process gets `SIGTERM` and a force-kill
//!    timer is armed; when that one fires too it gets `SIGKILL`.
//! 4. Once the process has exited a timed out run is reported as
//!    [`BuilderError::TimedOut`], or retried once if the options allow it.
//!
//! All timer state is owned by a single supervisor thread fed over a channel
//! by the stdout reader and by the waiting caller. The caller reads the
//! supervisor's verdict only after the process exited.

use std::io::{self, BufRead, BufReader};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::builders::common::printable_command;
use crate::types::BuilderError;

/// Liveness settings of one diagnostic run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticOptions {
    /// Substring whose appearance re-arms the hang timer. Empty means every
    /// output line counts.
    pub liveness_pattern: String,
    pub hang_timeout: Duration,
    pub force_kill_timeout: Duration,
    /// Retry a hung run once before reporting the timeout.
    pub retry_on_hang: bool,
}

impl DiagnosticOptions {
    /// Settings for mdtool, which hangs while loading projects.
    pub fn mdtool() -> Self {
        Self {
            liveness_pattern: "Loading projects".to_string(),
            hang_timeout: Duration::from_secs(300),
            force_kill_timeout: Duration::from_secs(60),
            retry_on_hang: true,
        }
    }

    /// Settings for xbuild: any output is progress.
    pub fn xbuild() -> Self {
        Self {
            liveness_pattern: String::new(),
            hang_timeout: Duration::from_secs(1200),
            force_kill_timeout: Duration::from_secs(60),
            retry_on_hang: false,
        }
    }

    fn is_live(&self, line: &str) -> bool {
        self.liveness_pattern.is_empty() || line.contains(&self.liveness_pattern)
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self::xbuild()
    }
}

enum Event {
    Line(String),
    Exited,
}

#[derive(Debug, Default)]
struct Supervision {
    timed_out: bool,
    signal_errors: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

/// Runs `argv` under hang supervision and blocks until the process exits.
///
/// # Errors
///
/// * [`BuilderError::Spawn`] if the process cannot be started
/// * [`BuilderError::TimedOut`] if the process was stopped by the hang
///   timer (after the single retry, when enabled)
/// * [`BuilderError::CommandFailed`] if the process exited unsuccessfully
pub fn run_diagnostic(argv: &[String], options: &DiagnosticOptions) -> Result<(), BuilderError> {
    let mut retry = options.retry_on_hang;
    loop {
        match run_once(argv, options) {
            Err(BuilderError::TimedOut { command, .. }) if retry => {
                warn!("{} timed out, retrying once", command);
                retry = false;
            }
            result => return result,
        }
    }
}

fn run_once(argv: &[String], options: &DiagnosticOptions) -> Result<(), BuilderError> {
    let printable = printable_command(argv);
    let Some((program, args)) = argv.split_first() else {
        return Err(BuilderError::Spawn {
            command: printable,
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        });
    };

    info!("=> {}", printable);
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| BuilderError::Spawn {
            command: printable.clone(),
            source,
        })?;
    let pid = child.id();

    let (tx, rx) = mpsc::channel();

    if let Some(stdout) = child.stdout.take() {
        let line_tx = tx.clone();
        // Not joined: processes left behind by the tool may keep the pipe open.
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                        println!("{}", line);
                        if line_tx.send(Event::Line(line)).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    let supervisor_options = options.clone();
    let supervisor = thread::spawn(move || supervise(rx, pid, &supervisor_options));

    let status = child.wait();
    // The supervisor may already be gone if it panicked; join reports that.
    let _ = tx.send(Event::Exited);
    let supervision = supervisor.join().unwrap_or_else(|_| Supervision {
        timed_out: false,
        signal_errors: vec!["hang supervisor panicked".to_string()],
    });
    let status = status?;

    if supervision.timed_out {
        return Err(BuilderError::TimedOut {
            command: printable,
            after: options.hang_timeout,
            signal_errors: supervision.signal_errors,
        });
    }

    if !supervision.signal_errors.is_empty() {
        debug!(
            "discarding signal errors of a cleanly exited process: {:?}",
            supervision.signal_errors
        );
    }
    check_status(&printable, status)
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), BuilderError> {
    if status.success() {
        Ok(())
    } else {
        Err(BuilderError::CommandFailed {
            command: command.to_string(),
            status: status.to_string(),
        })
    }
}

fn supervise(rx: Receiver<Event>, pid: u32, options: &DiagnosticOptions) -> Supervision {
    let mut supervision = Supervision::default();
    let mut hang_deadline = Some(Instant::now() + options.hang_timeout);
    let mut kill_deadline: Option<Instant> = None;

    loop {
        let next_deadline = hang_deadline.into_iter().chain(kill_deadline).min();
        let event = match next_deadline {
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            Some(Event::Exited) => break,
            Some(Event::Line(line)) => {
                hang_deadline = None;
                if !supervision.timed_out && options.is_live(line.trim()) {
                    hang_deadline = Some(Instant::now() + options.hang_timeout);
                }
            }
            None => {
                let now = Instant::now();
                if hang_deadline.is_some_and(|deadline| deadline <= now) {
                    hang_deadline = None;
                    supervision.timed_out = true;
                    warn!(
                        "no liveness output for {:?}, terminating process {}",
                        options.hang_timeout, pid
                    );
                    if let Err(err) = send_signal(pid, Signal::Terminate) {
                        supervision
                            .signal_errors
                            .push(format!("failed to terminate process {}: {}", pid, err));
                    }
                    kill_deadline = Some(now + options.force_kill_timeout);
                } else if kill_deadline.is_some_and(|deadline| deadline <= now) {
                    kill_deadline = None;
                    warn!(
                        "process {} still running {:?} after terminate, killing it",
                        pid, options.force_kill_timeout
                    );
                    if let Err(err) = send_signal(pid, Signal::Kill) {
                        supervision
                            .signal_errors
                            .push(format!("failed to kill process {}: {}", pid, err));
                    }
                }
            }
        }
    }

    supervision
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) -> io::Result<()> {
    let signal = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: kill(2) only takes plain integers.
    let result = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: Signal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signalling processes is only supported on unix",
    ))
}
