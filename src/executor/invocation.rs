//! Invocation descriptors
//!
//! An [`Invocation`] says what to run and how: an argument vector or a
//! shell string, an optional timeout, and whether the caller waits for
//! completion or gets a handle back immediately.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ExecError;

use super::encoding::Encoding;

/// What to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program followed by its arguments, executed directly
    Argv(Vec<String>),
    /// A command line handed to the shell
    Shell(String),
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Argv(argv) => write!(f, "{}", argv.join(" ")),
            CommandSpec::Shell(line) => write!(f, "{}", line),
        }
    }
}

/// Whether `execute` blocks until completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Return the finalized result
    #[default]
    Sync,
    /// Return as soon as the process is spawned; the caller polls
    Async,
}

/// Immutable description of one command execution
#[derive(Debug, Clone)]
pub struct Invocation {
    command: CommandSpec,
    timeout: Option<Duration>,
    mode: ExecMode,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    encoding: Option<Encoding>,
    shell: Option<(String, String)>,
}

impl Invocation {
    fn new(command: CommandSpec) -> Self {
        Self {
            command,
            timeout: None,
            mode: ExecMode::Sync,
            working_dir: None,
            env: HashMap::new(),
            encoding: None,
            shell: None,
        }
    }

    /// Run a program with arguments, no shell involved
    pub fn argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandSpec::Argv(argv.into_iter().map(Into::into).collect()))
    }

    /// Run a command line through the shell
    pub fn shell(line: impl Into<String>) -> Self {
        Self::new(CommandSpec::Shell(line.into()))
    }

    /// Tokenize a command line with shell quoting rules and run it directly
    pub fn parse(line: &str) -> Result<Self, ExecError> {
        let argv = shlex::split(line)
            .ok_or_else(|| ExecError::InvalidCommand(format!("cannot tokenize '{}'", line)))?;
        if argv.is_empty() {
            return Err(ExecError::InvalidCommand("empty command".to_string()));
        }
        Ok(Self::argv(argv))
    }

    /// Set the timeout, measured from spawn
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set timeout in (fractional) seconds; negative values clamp to zero
    pub fn with_timeout_secs(self, secs: f64) -> Self {
        self.with_timeout(secs_to_duration(secs))
    }

    /// Set the execution mode
    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `with_mode(ExecMode::Async)`
    pub fn detached(self) -> Self {
        self.with_mode(ExecMode::Async)
    }

    /// Set the working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the display encoding for the result's text accessors
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Override the shell program and its command flag (e.g. `bash`, `-c`)
    pub fn with_shell(mut self, program: impl Into<String>, flag: impl Into<String>) -> Self {
        self.shell = Some((program.into(), flag.into()));
        self
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    pub fn working_dir(&self) -> Option<&std::path::Path> {
        self.working_dir.as_deref()
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn shell_override(&self) -> Option<(&str, &str)> {
        self.shell.as_ref().map(|(p, f)| (p.as_str(), f.as_str()))
    }

    /// Resolve into a program and its arguments.
    ///
    /// `default_shell` is used for `Shell` commands without an override.
    pub fn program_and_args(
        &self,
        default_shell: (&str, &str),
    ) -> Result<(String, Vec<String>), ExecError> {
        match &self.command {
            CommandSpec::Argv(argv) => {
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| ExecError::InvalidCommand("empty argument vector".to_string()))?;
                Ok((program.clone(), args.to_vec()))
            }
            CommandSpec::Shell(line) => {
                let (shell, flag) = self.shell_override().unwrap_or(default_shell);
                Ok((shell.to_string(), vec![flag.to_string(), line.clone()]))
            }
        }
    }
}

/// Convert seconds to a duration, clamping negatives and NaN to zero
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
