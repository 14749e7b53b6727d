//! procrun CLI entry point
//!
//! Usage:
//!   procrun run [OPTIONS] -- <command>...     Run to completion
//!   procrun watch [OPTIONS] -- <command>...   Run detached, stream output
//!   procrun config                            Show configuration

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use procrun::cli::commands::{
    process_exit_code, ConfigArgs, ConfigFormat, OutputFormat, RunArgs, WatchArgs,
};
use procrun::cli::{Cli, Commands};
use procrun::config::{find_config_files, load_config, Config};
use procrun::{install_shutdown_hook, ErrorInfo, ExecError, Executor, ProcessResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    // Anything detached and still alive when main returns gets killed here
    let _cleanup = install_shutdown_hook(config.cleanup.handle_signals);

    match run(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, config: Config) -> Result<u8> {
    match cli.command {
        Commands::Run(args) => run_command(args, &config, cli.verbose).await,
        Commands::Watch(args) => watch_command(args, &config, cli.verbose).await,
        Commands::Config(args) => {
            show_config(args, &config)?;
            Ok(0)
        }
    }
}

/// Run a command to completion
async fn run_command(args: RunArgs, config: &Config, verbose: bool) -> Result<u8> {
    let invocation = args.exec.to_invocation()?;
    let executor = Executor::with_config(config);

    if verbose {
        eprintln!("{}: {}", "running".cyan(), invocation.command());
    }

    let result = match executor.run(&invocation).await {
        Ok(result) => result,
        Err(e) => return launch_failure(e, matches!(args.format, OutputFormat::Json)),
    };

    match args.format {
        OutputFormat::Plain => {
            std::io::stdout().write_all(&result.stdout())?;
            std::io::stderr().write_all(&result.stderr())?;
        }
        OutputFormat::Table => print!("{}", result),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.summary())?);
        }
    }

    report_outcome(&result, verbose);
    Ok(process_exit_code(result.exit_code(), result.timed_out()))
}

/// Run a command detached and stream its output by polling
async fn watch_command(args: WatchArgs, config: &Config, verbose: bool) -> Result<u8> {
    let invocation = args.exec.to_invocation()?.detached();
    let executor = Executor::with_config(config);
    let interval = args
        .interval_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| config.defaults.poll_interval());

    let result = match executor.execute(&invocation).await {
        Ok(result) => result,
        Err(e) => return launch_failure(e, false),
    };

    if verbose {
        eprintln!(
            "{}: {} (pid {})",
            "watching".cyan(),
            result.command(),
            result.pid().map(|p| p.to_string()).unwrap_or_else(|| "?".into())
        );
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        // Checked before draining so the final chunk is never missed
        let finished = !result.is_running();
        flush_output(&result)?;
        if finished {
            break;
        }
        ticker.tick().await;
    }

    report_outcome(&result, verbose);
    Ok(process_exit_code(result.exit_code(), result.timed_out()))
}

/// Print what the process produced since the last call
fn flush_output(result: &ProcessResult) -> Result<()> {
    let stdout = result.take_stdout();
    let stderr = result.take_stderr();

    let mut out = std::io::stdout().lock();
    out.write_all(&stdout)?;
    out.flush()?;
    let mut err = std::io::stderr().lock();
    err.write_all(&stderr)?;
    err.flush()?;
    Ok(())
}

fn report_outcome(result: &ProcessResult, verbose: bool) {
    if result.timed_out() {
        eprintln!(
            "{}: command timed out after {}ms and was killed",
            "timeout".yellow().bold(),
            result.elapsed().map(|d| d.as_millis()).unwrap_or_default()
        );
    } else if verbose {
        eprintln!(
            "{}: exit code {:?} in {}ms",
            "finished".green(),
            result.exit_code(),
            result.elapsed().map(|d| d.as_millis()).unwrap_or_default()
        );
    }
}

fn launch_failure(err: ExecError, json: bool) -> Result<u8> {
    let info = ErrorInfo::from(&err);
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(1);
    }
    if let Some(ref hint) = info.suggestion {
        eprintln!("{}: {}", "hint".cyan(), hint);
    }
    Err(anyhow::anyhow!(info.message))
}

/// Show resolved configuration
fn show_config(args: ConfigArgs, config: &Config) -> Result<()> {
    match args.format {
        ConfigFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        ConfigFormat::Toml => print!("{}", toml::to_string_pretty(config)?),
        ConfigFormat::Table => {
            let defaults = &config.defaults;
            println!(
                "{}: {}",
                "Timeout".cyan(),
                defaults
                    .timeout_secs
                    .map(|t| format!("{}s", t))
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("{}: {}", "Encoding".cyan(), defaults.encoding);
            println!("{}: {} {}", "Shell".cyan(), defaults.shell, defaults.shell_flag);
            println!("{}: {}ms", "Poll Interval".cyan(), defaults.poll_interval_ms);
            println!(
                "{}: {}",
                "Signal Cleanup".cyan(),
                config.cleanup.handle_signals
            );

            let files = find_config_files();
            println!();
            println!("{}:", "Config Files".cyan());
            if files.is_empty() {
                println!("  None");
            } else {
                for file in files {
                    println!("  - {}", file.display());
                }
            }
        }
    }
    Ok(())
}
