//! Command execution module
//!
//! Provides process execution with:
//! - Concurrent stdout/stderr capture, no truncation
//! - Timeouts that kill the whole process tree
//! - Blocking and detached (pollable) modes

pub mod buffer;
pub mod encoding;
pub mod invocation;
pub mod pump;
pub mod result;
pub mod runner;

pub use buffer::OutputBuffer;
pub use encoding::Encoding;
pub use invocation::{CommandSpec, ExecMode, Invocation};
pub use pump::StreamPump;
pub use result::{ProcessResult, ResultSummary};
pub use runner::Executor;
