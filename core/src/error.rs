//! Core error types and utilities

use std::io;
use thiserror::Error;

/// Why a clean spawn could not produce an exit status
///
/// A nonzero exit or a death by signal is not a failure at this level; those
/// are reported through [`crate::process::ExitOutcome`].
#[derive(Error, Debug)]
pub enum SpawnFailure {
    /// The child could not be created, or the program could not be executed
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The child was created but waiting for it failed
    #[error("failed to wait for '{program}' (pid {pid}): {source}")]
    Wait {
        program: String,
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// Parent-side signal dispositions could not be adjusted before spawning
    #[error("failed to adjust signal dispositions for '{program}': {source}")]
    Signal {
        program: String,
        #[source]
        source: nix::errno::Errno,
    },
}

impl SpawnFailure {
    /// Name of the program this failure refers to
    pub fn program(&self) -> &str {
        match self {
            SpawnFailure::Spawn { program, .. }
            | SpawnFailure::Wait { program, .. }
            | SpawnFailure::Signal { program, .. } => program,
        }
    }

    /// Underlying I/O error kind, when there is one
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            SpawnFailure::Spawn { source, .. } | SpawnFailure::Wait { source, .. } => {
                Some(source.kind())
            }
            SpawnFailure::Signal { .. } => None,
        }
    }
}

/// Core-specific error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Signal error: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("Spawn error: {0}")]
    Spawn(#[from] SpawnFailure),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Generic error: {0}")]
    Other(String),
}

impl CoreError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ConfigurationError(_) => "CORE001",
            CoreError::ValidationError(_) => "CORE002",
            CoreError::InitializationError(_) => "CORE003",
            CoreError::Signal(_) => "CORE004",
            CoreError::Spawn(_) => "CORE005",
            CoreError::IoError(_) => "CORE006",
            CoreError::Other(_) => "CORE999",
        }
    }
}

/// Core-specific result type
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}
