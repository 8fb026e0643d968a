//! Core functionality for clean child process spawning
//!
//! [`clean_spawn`] launches a program in a child that starts with default
//! signal dispositions, runs in its own session, and inherits no descriptors
//! the parent leaked without `O_CLOEXEC`. The caller blocks until the child
//! exits and gets back a single boolean: did it exit with status zero.
//! [`clean_spawn_status`] and [`Spawner::spawn_status`] keep the structured
//! outcome for callers that need to tell a nonzero exit from a signal death
//! or a spawn failure.

pub mod config;
pub mod error;
pub mod logging;
#[cfg(unix)]
pub mod process;
#[cfg(unix)]
pub mod signals;
#[cfg(unix)]
mod spawner;

#[cfg(test)]
mod error_tests;

pub use config::{SpawnConfig, SpawnOptions};
pub use error::{CoreError, Result, SpawnFailure};
#[cfg(unix)]
pub use process::ExitOutcome;
#[cfg(unix)]
pub use signals::SignalExtension;
#[cfg(unix)]
pub use spawner::{clean_spawn, clean_spawn_status, Spawner};
