//! Command-line wrapper around `cleanspawn-core`
//!
//! Configuration is layered: defaults, then `--config FILE`, then
//! `CLEAN_SPAWN_*` environment variables, then flags.

pub mod error;

pub use error::{CliError, Result};

use clap::Parser;
use cleanspawn_core::{SpawnConfig, Spawner};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

/// Exit code when the child exited with status zero
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when the clean spawn returned false
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for configuration and usage errors
pub const EXIT_USAGE: i32 = 2;

/// Command-line arguments for `clean-spawn`
#[derive(Parser, Debug)]
#[command(name = "clean-spawn")]
#[command(about = "Run a program with default signal dispositions in its own session")]
#[command(version)]
pub struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep the child in the caller's session and process group
    #[arg(long)]
    pub no_new_session: bool,

    /// Let the child inherit signal dispositions and the signal mask
    #[arg(long)]
    pub no_reset_signals: bool,

    /// Do not mark inherited descriptors close-on-exec
    #[arg(long)]
    pub keep_fds: bool,

    /// Ignore SIGINT/SIGQUIT while waiting for the child
    #[arg(long)]
    pub defer_interrupts: bool,

    /// Tracing level (overridden by RUST_LOG)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Program to run, followed by its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "EXECUTABLE"
    )]
    pub command: Vec<OsString>,
}

impl Args {
    /// Resolve the effective configuration for these arguments
    pub fn resolve_config(&self) -> Result<SpawnConfig> {
        let base = match &self.config {
            Some(path) => SpawnConfig::from_toml_path(path)?,
            None => SpawnConfig::default(),
        };
        let mut config = base.with_env_overrides()?;

        if self.no_new_session {
            config.new_session = false;
        }
        if self.no_reset_signals {
            config.reset_signals = false;
        }
        if self.keep_fds {
            config.cloexec_inherited_fds = false;
        }
        if self.defer_interrupts {
            config.defer_interrupts = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the command described by `args`; `Ok(true)` when it exited with zero
pub fn run(args: &Args, config: &SpawnConfig) -> Result<bool> {
    let (executable, rest) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::InvalidArgument("missing executable".to_string()))?;
    if executable.is_empty() {
        return Err(CliError::InvalidArgument(
            "executable cannot be empty".to_string(),
        ));
    }

    let spawner = Spawner::new(config)?;
    debug!("Running {:?} with {:?}", executable, spawner.options());
    Ok(spawner.spawn(executable, rest))
}

/// Map a run result onto the process exit code
pub fn exit_code(result: &Result<bool>) -> i32 {
    match result {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_FAILURE,
        Err(_) => EXIT_USAGE,
    }
}
