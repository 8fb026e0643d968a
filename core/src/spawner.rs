//! Configured entry point for clean spawning

use crate::config::{SpawnConfig, SpawnOptions};
use crate::error::SpawnFailure;
use crate::process::{self, ExitOutcome};
use crate::signals::SignalExtension;
use crate::Result;
use std::ffi::{OsStr, OsString};
use std::sync::LazyLock;
use tracing::{debug, warn};

static GLOBAL: LazyLock<Spawner> = LazyLock::new(|| {
    let config = SpawnConfig::from_env().unwrap_or_else(|e| {
        warn!("Ignoring invalid clean-spawn environment ({}), using defaults", e);
        SpawnConfig::default()
    });
    Spawner::from_valid_config(&config)
});

/// Spawns children cleanly with options resolved once from a [`SpawnConfig`]
#[derive(Debug)]
pub struct Spawner {
    options: SpawnOptions,
    signals: Option<SignalExtension>,
}

impl Spawner {
    /// Build a spawner, initialising the signal extension if the config asks for it
    pub fn new(config: &SpawnConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: &SpawnConfig) -> Self {
        let signals = config.signal_extension.then(SignalExtension::init);
        let spawner = Self {
            options: config.options(),
            signals,
        };
        debug!(
            "Spawner ready: {:?}, signal extension {}",
            spawner.options,
            if spawner.signals.is_some() { "on" } else { "off" }
        );
        spawner
    }

    /// Build a spawner from explicit options, without the signal extension
    pub fn with_options(options: SpawnOptions) -> Self {
        Self {
            options,
            signals: None,
        }
    }

    /// Process-wide spawner configured from `CLEAN_SPAWN_*` variables on first use
    pub fn global() -> &'static Spawner {
        &GLOBAL
    }

    /// Options applied to every child
    pub fn options(&self) -> SpawnOptions {
        self.options
    }

    /// The signal extension, when enabled
    pub fn signals(&self) -> Option<&SignalExtension> {
        self.signals.as_ref()
    }

    /// Spawn cleanly and wait, keeping the structured outcome
    pub fn spawn_status<P, I, S>(
        &self,
        executable: P,
        args: I,
    ) -> std::result::Result<ExitOutcome, SpawnFailure>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        process::spawn_and_wait(self.options, executable.as_ref(), args)
    }

    /// Spawn cleanly and wait; true iff the child exited with status zero
    pub fn spawn<P, I, S>(&self, executable: P, args: I) -> bool
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        process::spawn_success(self.options, executable.as_ref(), args)
    }

    /// Like [`Spawner::spawn`], but waits on tokio's blocking pool
    pub async fn spawn_async<P, I, S>(&self, executable: P, args: I) -> bool
    where
        P: Into<OsString>,
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let options = self.options;
        let executable: OsString = executable.into();
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        match tokio::task::spawn_blocking(move || {
            process::spawn_success(options, &executable, args)
        })
        .await
        {
            Ok(success) => success,
            Err(e) => {
                warn!("Clean spawn task failed: {}", e);
                false
            }
        }
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::with_options(SpawnOptions::default())
    }
}

/// Spawn `executable` cleanly and report whether it exited with status zero
///
/// Uses [`Spawner::global`]. Nonzero exits, signal deaths and spawn failures
/// such as a missing executable all return `false`.
///
/// ```no_run
/// use cleanspawn_core::clean_spawn;
///
/// assert!(clean_spawn("/bin/bash", ["-c", "ls -l >/dev/null"]));
/// assert!(!clean_spawn("/bin/bash", ["-c", "nonexist 2>/dev/null"]));
/// ```
pub fn clean_spawn<P, I, S>(executable: P, args: I) -> bool
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Spawner::global().spawn(executable, args)
}

/// Structured form of [`clean_spawn`]
pub fn clean_spawn_status<P, I, S>(
    executable: P,
    args: I,
) -> std::result::Result<ExitOutcome, SpawnFailure>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Spawner::global().spawn_status(executable, args)
}
