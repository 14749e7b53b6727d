//! procrun - Run external commands without losing output or leaking processes
//!
//! ## Features
//!
//! - Concurrent capture of stdout and stderr, no truncation
//! - Wall-clock timeouts that kill the whole process tree
//! - Blocking and detached (pollable) execution
//! - Process-exit cleanup of anything still running
//! - XDG-compliant layered configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use procrun::{Executor, Invocation};
//!
//! # async fn demo() -> Result<(), procrun::ExecError> {
//! let executor = Executor::new();
//! let result = executor
//!     .run(&Invocation::argv(["echo", "hello"]).with_timeout(Duration::from_secs(5)))
//!     .await?;
//! assert_eq!(result.exit_code(), Some(0));
//! assert_eq!(result.stdout_text(), "hello");
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod process;

pub use cleanup::{install_shutdown_hook, CleanupRegistry, ShutdownGuard};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{ErrorInfo, ExecError};
pub use executor::{
    CommandSpec, Encoding, ExecMode, Executor, Invocation, ProcessResult, ResultSummary,
};
pub use process::TermSignal;
