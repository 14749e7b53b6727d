//! CLI command definitions using clap
//!
//! Defines all CLI subcommands and their arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::ExecError;
use crate::executor::{Encoding, Invocation};

/// Exit status reported when the command was killed on timeout (as timeout(1) does)
pub const TIMEOUT_EXIT_CODE: u8 = 124;

/// Run external commands with output capture, timeouts, and process-tree cleanup.
#[derive(Parser, Debug)]
#[command(name = "procrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command to completion and print its output
    Run(RunArgs),

    /// Run a command detached, streaming output as it arrives
    Watch(WatchArgs),

    /// Show resolved configuration
    Config(ConfigArgs),
}

/// Options shared by `run` and `watch`
#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Timeout in seconds (fractions allowed; 0 or less kills immediately)
    #[arg(short, long, allow_negative_numbers = true)]
    pub timeout: Option<f64>,

    /// Hand the command line to the shell instead of executing it directly
    #[arg(short, long)]
    pub shell: bool,

    /// Working directory
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Environment variables in KEY=VALUE format
    #[arg(short = 'e', long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Encoding used to display output (utf8, latin1, ascii)
    #[arg(long, value_parser = parse_encoding)]
    pub encoding: Option<Encoding>,

    /// Command to run; a single argument is split with shell quoting rules
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl CommandArgs {
    /// Build the invocation these arguments describe
    pub fn to_invocation(&self) -> Result<Invocation, ExecError> {
        let mut invocation = if self.shell {
            Invocation::shell(self.command.join(" "))
        } else if let [line] = self.command.as_slice() {
            Invocation::parse(line)?
        } else {
            Invocation::argv(self.command.iter().cloned())
        };

        if let Some(secs) = self.timeout {
            invocation = invocation.with_timeout_secs(secs);
        }
        if let Some(ref dir) = self.dir {
            invocation = invocation.in_dir(dir);
        }
        for (key, value) in &self.env {
            invocation = invocation.with_env(key, value);
        }
        if let Some(encoding) = self.encoding {
            invocation = invocation.with_encoding(encoding);
        }

        Ok(invocation)
    }
}

/// Arguments for the `run` subcommand
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub exec: CommandArgs,
}

/// Arguments for the `watch` subcommand
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Polling interval in milliseconds (defaults to the configured value)
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    #[command(flatten)]
    pub exec: CommandArgs,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Command output passed through as-is
    Plain,
    /// Human-readable report
    Table,
    /// JSON summary
    Json,
}

/// Arguments for the `config` subcommand
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: ConfigFormat,
}

/// Config output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Table,
    Json,
    Toml,
}

/// Parse KEY=VALUE argument
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid argument '{}': expected KEY=VALUE format", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn parse_encoding(s: &str) -> Result<Encoding, String> {
    s.parse()
}

/// Map a command's outcome to this program's exit status
pub fn process_exit_code(exit_code: Option<i32>, timed_out: bool) -> u8 {
    if timed_out {
        return TIMEOUT_EXIT_CODE;
    }
    match exit_code {
        Some(code) if (0..=255).contains(&code) => code as u8,
        // Killed by signal N: report 128 + N like a shell would
        Some(code) if (-127..0).contains(&code) => (128 - code) as u8,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CommandSpec, ExecMode};
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn test_cli_parse_run_argv() {
        let cli = Cli::parse_from(["procrun", "run", "--", "echo", "-n", "hi"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.exec.command, vec!["echo", "-n", "hi"]);
            assert!(matches!(args.format, OutputFormat::Plain));
            let inv = args.exec.to_invocation().unwrap();
            assert_eq!(
                inv.command(),
                &CommandSpec::Argv(vec!["echo".into(), "-n".into(), "hi".into()])
            );
            assert_eq!(inv.mode(), ExecMode::Sync);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_single_string_is_tokenized() {
        let cli = Cli::parse_from(["procrun", "run", "echo 'hello world'"]);
        if let Commands::Run(args) = cli.command {
            let inv = args.exec.to_invocation().unwrap();
            assert_eq!(
                inv.command(),
                &CommandSpec::Argv(vec!["echo".into(), "hello world".into()])
            );
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_shell_with_options() {
        let cli = Cli::parse_from([
            "procrun",
            "run",
            "--shell",
            "-t",
            "0.5",
            "-d",
            "/tmp",
            "-e",
            "A=1",
            "--encoding",
            "latin1",
            "-f",
            "json",
            "echo $A | tr 1 2",
        ]);
        if let Commands::Run(args) = cli.command {
            assert!(matches!(args.format, OutputFormat::Json));
            let inv = args.exec.to_invocation().unwrap();
            assert_eq!(inv.command(), &CommandSpec::Shell("echo $A | tr 1 2".into()));
            assert_eq!(inv.timeout(), Some(Duration::from_millis(500)));
            assert_eq!(inv.working_dir(), Some(std::path::Path::new("/tmp")));
            assert_eq!(inv.env().get("A"), Some(&"1".to_string()));
            assert_eq!(inv.encoding(), Some(Encoding::Latin1));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_negative_timeout() {
        let cli = Cli::parse_from(["procrun", "run", "-t", "-1", "sleep", "5"]);
        if let Commands::Run(args) = cli.command {
            let inv = args.exec.to_invocation().unwrap();
            assert_eq!(inv.timeout(), Some(Duration::ZERO));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_watch() {
        let cli = Cli::parse_from(["procrun", "watch", "-i", "50", "--", "tail", "-f", "log"]);
        if let Commands::Watch(args) = cli.command {
            assert_eq!(args.interval_ms, Some(50));
            assert_eq!(args.exec.command, vec!["tail", "-f", "log"]);
        } else {
            panic!("Expected Watch command");
        }
    }

    #[test]
    fn test_cli_parse_config() {
        let cli = Cli::parse_from(["procrun", "config", "-f", "toml"]);
        if let Commands::Config(args) = cli.command {
            assert!(matches!(args.format, ConfigFormat::Toml));
        } else {
            panic!("Expected Config command");
        }
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["procrun", "run"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["procrun", "-v", "-c", "/etc/x.toml", "config"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some("/etc/x.toml".to_string()));
    }

    #[test]
    fn test_cli_invalid_command_string() {
        let cli = Cli::parse_from(["procrun", "run", "echo 'oops"]);
        if let Commands::Run(args) = cli.command {
            assert!(matches!(
                args.exec.to_invocation(),
                Err(ExecError::InvalidCommand(_))
            ));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("FOO=bar=baz"),
            Ok(("FOO".to_string(), "bar=baz".to_string()))
        );
        assert!(parse_key_value("INVALID").is_err());
    }

    #[test]
    fn test_process_exit_code() {
        assert_eq!(process_exit_code(Some(0), false), 0);
        assert_eq!(process_exit_code(Some(3), false), 3);
        assert_eq!(process_exit_code(Some(-9), false), 137);
        assert_eq!(process_exit_code(Some(-9), true), TIMEOUT_EXIT_CODE);
        assert_eq!(process_exit_code(None, false), 1);
        assert_eq!(process_exit_code(Some(1000), false), 1);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }
}
