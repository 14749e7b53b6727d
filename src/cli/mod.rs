//! CLI module for procrun
//!
//! Provides command-line interface with the following subcommands:
//! - `run` - Run a command to completion
//! - `watch` - Run a command detached and stream its output while polling
//! - `config` - Show configuration

pub mod commands;

pub use commands::{Cli, Commands};
