//! Execution engine
//!
//! Spawns the process with piped output, starts one pump per stream, waits
//! for exit (bounded by the timeout, if any), and finalizes the result only
//! after both pumps have drained their streams.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::cleanup::CleanupRegistry;
use crate::config::Config;
use crate::error::ExecError;
use crate::process::TermSignal;

use super::encoding::Encoding;
use super::invocation::{ExecMode, Invocation};
use super::pump::StreamPump;
use super::result::{ProcessResult, Shared};

/// Exit code recorded when waiting on the child fails after spawn
const WAIT_FAILED_EXIT_CODE: i32 = -1;

/// Runs invocations and tracks detached ones for cleanup
#[derive(Clone)]
pub struct Executor {
    registry: Arc<CleanupRegistry>,
    default_timeout: Option<Duration>,
    encoding: Encoding,
    shell: String,
    shell_flag: String,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Executor using built-in defaults and the global cleanup registry
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Executor using configured defaults and the global cleanup registry
    pub fn with_config(config: &Config) -> Self {
        Self {
            registry: CleanupRegistry::global(),
            default_timeout: config.defaults.timeout(),
            encoding: config.defaults.encoding,
            shell: config.defaults.shell.clone(),
            shell_flag: config.defaults.shell_flag.clone(),
        }
    }

    /// Track detached invocations in `registry` instead of the global one
    pub fn with_registry(mut self, registry: Arc<CleanupRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Timeout for invocations that do not set one
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &Arc<CleanupRegistry> {
        &self.registry
    }

    /// Run according to the invocation's mode
    pub async fn execute(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError> {
        match invocation.mode() {
            ExecMode::Sync => self.run(invocation).await,
            ExecMode::Async => self.spawn(invocation),
        }
    }

    /// Run to completion and return the finalized result
    ///
    /// The invocation sits in the cleanup registry while it runs, so a
    /// signal-triggered shutdown kills it even though nothing has been
    /// returned to the caller yet.
    ///
    /// # Errors
    /// * `ExecError::InvalidCommand` - The invocation has no program
    /// * `ExecError::SpawnFailed` - The OS could not start the process
    pub async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError> {
        let (result, child) = self.launch(invocation)?;
        self.registry.register(&result.shared);

        let deadline = self.deadline(invocation);
        supervise(Arc::clone(&result.shared), child, deadline).await;
        Ok(result)
    }

    /// Start the process and return immediately; the rest runs on a tokio task.
    ///
    /// The result stays in the cleanup registry until it is final.
    ///
    /// # Errors
    /// * `ExecError::Runtime` - Called outside a tokio runtime
    /// * `ExecError::InvalidCommand` / `ExecError::SpawnFailed` - As for [`run`](Self::run)
    pub fn spawn(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ExecError::Runtime(e.to_string()))?;

        let (result, child) = self.launch(invocation)?;
        self.registry.register(&result.shared);

        let deadline = self.deadline(invocation);
        handle.spawn(supervise(Arc::clone(&result.shared), child, deadline));
        Ok(result)
    }

    /// Blocking wrapper around [`run`](Self::run) for non-async callers
    ///
    /// Builds a private runtime, so it must not be called from inside one.
    pub fn run_blocking(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExecError::Runtime(format!("Failed to create runtime: {}", e)))?;

        rt.block_on(self.run(invocation))
    }

    fn deadline(&self, invocation: &Invocation) -> Option<Instant> {
        invocation
            .timeout()
            .or(self.default_timeout)
            .map(|timeout| Instant::now() + timeout)
    }

    fn launch(&self, invocation: &Invocation) -> Result<(ProcessResult, Child), ExecError> {
        let (program, args) =
            invocation.program_and_args((self.shell.as_str(), self.shell_flag.as_str()))?;
        let command_str = invocation.command().to_string();
        let encoding = invocation.encoding().unwrap_or(self.encoding);

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Own process group, so the whole subtree can be signalled
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(dir) = invocation.working_dir() {
            cmd.current_dir(dir);
        }
        for (key, value) in invocation.env() {
            cmd.env(key, value);
        }

        let result = ProcessResult::new(command_str.clone(), encoding);

        tracing::debug!("Executing: {}", command_str);

        let child = cmd
            .spawn()
            .map_err(|e| ExecError::spawn_failed(command_str.clone(), &e))?;

        match child.id() {
            Some(pid) => {
                result.shared.attach(pid);
                tracing::debug!(pid, "Process spawned");
            }
            None => tracing::warn!("Spawned process already reaped: {}", command_str),
        }

        Ok((result, child))
    }
}

/// Drive one spawned child to a final result
async fn supervise(shared: Arc<Shared>, mut child: Child, deadline: Option<Instant>) {
    let pumps: Vec<StreamPump> = [
        child
            .stdout
            .take()
            .map(|pipe| StreamPump::start("stdout", pipe, shared.stdout.clone())),
        child
            .stderr
            .take()
            .map(|pipe| StreamPump::start("stderr", pipe, shared.stderr.clone())),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = match deadline {
        None => child.wait().await,
        Some(deadline) => match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(pid = ?shared.pid(), "Command timed out, terminating process tree");
                shared.mark_timed_out();
                shared.terminate(TermSignal::platform_default());
                child.wait().await
            }
        },
    };
    shared.mark_reaped();

    let exit_code = match status {
        Ok(status) => exit_code_of(status),
        Err(e) => {
            tracing::warn!(pid = ?shared.pid(), "Failed to wait for process: {}", e);
            // Make sure nothing keeps the pipes open
            shared.terminate(TermSignal::platform_default());
            WAIT_FAILED_EXIT_CODE
        }
    };

    for pump in pumps {
        pump.join().await;
    }

    shared.finish(exit_code);
}

/// Exit code, or `-signal` for processes killed by a signal
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    WAIT_FAILED_EXIT_CODE
}
