//! Stream a command's merged stdout/stderr and check its exit code.
//!
//! `tailpipe` is a thin front end over the library: it spawns the given
//! command with stderr folded into stdout, relays each line as it arrives,
//! and exits with the child's own exit code. Unexpected exit codes and
//! timeouts are reported on stderr with the last few lines of output.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::error;

use tailpipe::config::{RunnerConfig, load_config};
use tailpipe::errors::RunError;
use tailpipe::exit_codes;
use tailpipe::io::process::RunRequest;
use tailpipe::io::runner::{CommandRunner, ProcessRunner};

#[derive(Debug, Parser)]
#[command(
    name = "tailpipe",
    version,
    about = "Run a command, stream its merged output, and check its exit code"
)]
struct Cli {
    /// Path to an optional TOML config with run defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Exit codes to treat as success (comma-separated or repeated).
    #[arg(
        long = "ok",
        value_name = "CODE",
        value_delimiter = ',',
        allow_negative_numbers = true
    )]
    ok_codes: Vec<i32>,

    /// Trailing output lines to keep for failure reports.
    #[arg(long, value_name = "N")]
    tail_capacity: Option<usize>,

    /// Kill the command if it runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Environment overrides for the command (KEY=VALUE, repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Command to run and its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

fn main() {
    tailpipe::logging::init();
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    let cfg = match cli.config.as_deref().map(load_config).transpose() {
        Ok(cfg) => cfg.unwrap_or_default(),
        Err(err) => {
            error!("{err:#}");
            return exit_codes::USAGE;
        }
    };
    let request = match build_request(&cli, &cfg) {
        Ok(request) => request,
        Err(err) => {
            error!("{err:#}");
            return exit_codes::USAGE;
        }
    };

    let result = ProcessRunner.run(&request, &mut |line| println!("{line}"));
    match result {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            error!("{err}");
            match err {
                RunError::UnexpectedExitStatus { exit_code, .. } => exit_code,
                RunError::Timeout { .. } => exit_codes::TIMEOUT,
                RunError::Spawn { .. } | RunError::Wait { .. } => exit_codes::SPAWN_FAILED,
                RunError::EmptyCommand => exit_codes::USAGE,
            }
        }
    }
}

/// Fold config defaults and CLI flags into a request; flags win.
fn build_request(cli: &Cli, cfg: &RunnerConfig) -> Result<RunRequest> {
    let mut request = RunRequest::new(cli.command.clone());
    request.acceptable_exit_codes = if cli.ok_codes.is_empty() {
        cfg.acceptable_exit_codes.iter().copied().collect()
    } else {
        cli.ok_codes.iter().copied().collect()
    };
    request.tail_capacity = cli.tail_capacity.unwrap_or(cfg.tail_capacity);
    request.timeout = cli
        .timeout_secs
        .or(cfg.timeout_secs)
        .map(Duration::from_secs);
    request.current_dir = cli.cwd.clone();
    request.env = parse_env_overrides(&cli.env)?;
    Ok(request)
}

fn parse_env_overrides(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --env `{pair}` (expected KEY=VALUE)"))?;
        if key.is_empty() {
            return Err(anyhow!("invalid --env `{pair}` (empty key)"));
        }
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}
