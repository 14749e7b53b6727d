//! Live and finalized state of one invocation
//!
//! [`ProcessResult`] is the caller's handle. The engine's background tasks and
//! the cleanup registry reach the same state through [`Shared`], so the handle
//! itself can be dropped at any time, and dropping it terminates whatever is
//! still running.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cleanup::CleanupRegistry;
use crate::process::{self, TermSignal};

use super::buffer::OutputBuffer;
use super::encoding::Encoding;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct Completion {
    exit_code: i32,
    elapsed: Duration,
}

/// State shared by the caller's handle, the engine, and the registry
pub(crate) struct Shared {
    id: u64,
    command: String,
    pub(crate) stdout: OutputBuffer,
    pub(crate) stderr: OutputBuffer,
    started_at: Instant,
    pid: OnceCell<u32>,
    reaped: AtomicBool,
    timed_out: AtomicBool,
    completion: Mutex<Option<Completion>>,
    done: watch::Sender<bool>,
    registry: Mutex<Weak<CleanupRegistry>>,
}

impl Shared {
    fn new(command: String) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            command,
            stdout: OutputBuffer::new(),
            stderr: OutputBuffer::new(),
            started_at: Instant::now(),
            pid: OnceCell::new(),
            reaped: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
            completion: Mutex::new(None),
            done,
            registry: Mutex::new(Weak::new()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid.get().copied()
    }

    pub(crate) fn attach(&self, pid: u32) {
        if self.pid.set(pid).is_err() {
            warn!(pid, "Result already has a process attached");
        }
    }

    pub(crate) fn set_registry(&self, registry: &Arc<CleanupRegistry>) {
        *self.registry.lock() = Arc::downgrade(registry);
    }

    /// The child has been waited on; its pid may now be reused
    pub(crate) fn mark_reaped(&self) {
        self.reaped.store(true, Ordering::Release);
    }

    pub(crate) fn mark_timed_out(&self) {
        self.timed_out.store(true, Ordering::Release);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.completion.lock().is_some()
    }

    /// Record exit code and elapsed time. Only the first call has effect.
    pub(crate) fn finish(&self, exit_code: i32) {
        {
            let mut completion = self.completion.lock();
            if completion.is_some() {
                return;
            }
            *completion = Some(Completion {
                exit_code,
                elapsed: self.started_at.elapsed(),
            });
        }
        debug!(id = self.id, exit_code, "Invocation finished");
        self.done.send_replace(true);
        self.deregister();
    }

    /// Signal the process subtree. Never fails; a vanished process is success.
    pub(crate) fn terminate(&self, signal: TermSignal) {
        let Some(pid) = self.pid() else {
            self.deregister();
            return;
        };

        if !self.is_finished() {
            if self.reaped.load(Ordering::Acquire) {
                // pid may belong to someone else now; only the group is still ours
                #[cfg(unix)]
                report(pid, process::signal_group(pid, signal));
            } else {
                for child in process::descendants(pid) {
                    report(child, process::signal_process(child, signal));
                }
                report(pid, process::signal_process(pid, signal));
                #[cfg(unix)]
                report(pid, process::signal_group(pid, signal));
            }
        }

        self.deregister();
    }

    fn deregister(&self) {
        let registry = self.registry.lock().upgrade();
        if let Some(registry) = registry {
            registry.unregister(self.id);
        }
    }
}

fn report(pid: u32, outcome: std::io::Result<()>) {
    if let Err(e) = outcome {
        warn!(pid, "Failed to signal process: {}", e);
    }
}

/// Handle to one invocation's output, timing, and exit status.
///
/// Dropping the handle terminates the process tree if it is still running.
pub struct ProcessResult {
    pub(crate) shared: Arc<Shared>,
    encoding: Encoding,
}

impl ProcessResult {
    pub(crate) fn new(command: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            shared: Arc::new(Shared::new(command.into())),
            encoding,
        }
    }

    /// The command line, for diagnostics
    pub fn command(&self) -> &str {
        &self.shared.command
    }

    /// OS process id, once spawned
    pub fn pid(&self) -> Option<u32> {
        self.shared.pid()
    }

    /// Exit code; `None` while running. Signal deaths report `-signal` on unix.
    pub fn exit_code(&self) -> Option<i32> {
        self.shared.completion.lock().map(|c| c.exit_code)
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }

    /// True from spawn until the result is final
    pub fn is_running(&self) -> bool {
        self.shared.pid().is_some() && !self.shared.is_finished()
    }

    /// Whether the engine forcibly terminated the process on timeout
    pub fn timed_out(&self) -> bool {
        self.shared.timed_out.load(Ordering::Acquire)
    }

    /// When the invocation was started
    pub fn started_at(&self) -> Instant {
        self.shared.started_at
    }

    /// Total run time; set together with the exit code
    pub fn elapsed(&self) -> Option<Duration> {
        self.shared.completion.lock().map(|c| c.elapsed)
    }

    /// Captured stdout so far
    pub fn stdout(&self) -> Vec<u8> {
        self.shared.stdout.snapshot()
    }

    /// Captured stderr so far
    pub fn stderr(&self) -> Vec<u8> {
        self.shared.stderr.snapshot()
    }

    /// Stdout decoded for display
    pub fn stdout_text(&self) -> String {
        self.encoding.decode_lossy(&self.stdout())
    }

    /// Stderr decoded for display
    pub fn stderr_text(&self) -> String {
        self.encoding.decode_lossy(&self.stderr())
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Empty both buffers; output produced afterwards accumulates from scratch
    pub fn clear_buffers(&self) {
        self.shared.stdout.clear();
        self.shared.stderr.clear();
    }

    /// Move out the stdout captured since the last take or clear
    pub fn take_stdout(&self) -> Vec<u8> {
        self.shared.stdout.take()
    }

    /// Move out the stderr captured since the last take or clear
    pub fn take_stderr(&self) -> Vec<u8> {
        self.shared.stderr.take()
    }

    /// Kill the process and all of its descendants with the platform's strongest signal
    pub fn terminate(&self) {
        self.terminate_with(TermSignal::platform_default());
    }

    /// Send `signal` to the process and all of its descendants
    pub fn terminate_with(&self, signal: TermSignal) {
        self.shared.terminate(signal);
    }

    /// Wait until the result is final
    pub async fn wait(&self) {
        if self.shared.pid().is_none() {
            return;
        }
        let mut rx = self.shared.done.subscribe();
        // The sender lives in `shared`, which we hold, so this cannot fail
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Serializable snapshot of the current state
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            command: self.command().to_string(),
            pid: self.pid(),
            running: self.is_running(),
            exit_code: self.exit_code(),
            timed_out: self.timed_out(),
            elapsed_ms: self
                .elapsed()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            stdout: self.stdout_text(),
            stderr: self.stderr_text(),
        }
    }
}

impl Drop for ProcessResult {
    fn drop(&mut self) {
        if self.is_running() {
            debug!(id = self.shared.id(), "Result dropped while running, terminating");
        }
        self.terminate();
    }
}

impl fmt::Debug for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessResult")
            .field("command", &self.command())
            .field("pid", &self.pid())
            .field("exit_code", &self.exit_code())
            .field("timed_out", &self.timed_out())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = "=".repeat(40);
        let stdout = self
            .encoding
            .decode_strict(&self.stdout())
            .unwrap_or_else(|| "<Binary data>".to_string());
        let stderr = self
            .encoding
            .decode_strict(&self.stderr())
            .unwrap_or_else(|| "<Binary data>".to_string());
        let exit_code = self
            .exit_code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "None".to_string());

        writeln!(f)?;
        writeln!(f, "{}", sep)?;
        writeln!(f, "Command: {}", self.command())?;
        writeln!(f, "{}", sep)?;
        writeln!(f, "Running: {}", self.is_running())?;
        writeln!(f, "Return code: {}", exit_code)?;
        writeln!(f, "Stdout:\n{}", stdout)?;
        writeln!(f, "Stderr:\n{}", stderr)?;
        writeln!(f, "{}", sep)
    }
}

/// Point-in-time view of a [`ProcessResult`]
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub running: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub stdout: String,
    pub stderr: String,
}
