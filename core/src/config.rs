//! Configuration loading and validation for clean spawning
//!
//! Configuration comes from three layers: built-in defaults, an optional TOML
//! file, and `CLEAN_SPAWN_*` environment variables. The environment wins over
//! the file. A resolved [`SpawnConfig`] is turned into [`SpawnOptions`] once,
//! when a [`crate::Spawner`] is built.

use crate::{CoreError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Enables the optional signal-handling extension
pub const ENV_SIGNAL_EXT: &str = "CLEAN_SPAWN_SIGNAL_EXT";
/// Places each child in its own session
pub const ENV_NEW_SESSION: &str = "CLEAN_SPAWN_NEW_SESSION";
/// Resets every catchable signal to its default disposition in the child
pub const ENV_RESET_SIGNALS: &str = "CLEAN_SPAWN_RESET_SIGNALS";
/// Marks inherited descriptors above stderr close-on-exec in the child
pub const ENV_CLOEXEC_FDS: &str = "CLEAN_SPAWN_CLOEXEC_FDS";
/// Ignores SIGINT/SIGQUIT in the parent while it waits
pub const ENV_DEFER_INTERRUPTS: &str = "CLEAN_SPAWN_DEFER_INTERRUPTS";
/// Default tracing level
pub const ENV_LOG: &str = "CLEAN_SPAWN_LOG";

/// Resolved configuration for a spawner
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnConfig {
    /// Initialise the signal-handling extension
    pub signal_extension: bool,
    /// Call `setsid()` in the child
    pub new_session: bool,
    /// Reset signal dispositions and the signal mask in the child
    pub reset_signals: bool,
    /// Mark descriptors above 2 close-on-exec in the child
    pub cloexec_inherited_fds: bool,
    /// Ignore SIGINT/SIGQUIT in the parent while waiting, like `system(3)`
    pub defer_interrupts: bool,
    /// Default level for `logging::init_tracing`
    pub log_level: String,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            signal_extension: false,
            new_session: true,
            reset_signals: true,
            cloexec_inherited_fds: true,
            defer_interrupts: false,
            log_level: "info".to_string(),
        }
    }
}

/// Per-spawn knobs derived from [`SpawnConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Call `setsid()` in the child
    pub new_session: bool,
    /// Reset dispositions and the signal mask in the child
    pub reset_signals: bool,
    /// Mark descriptors above 2 close-on-exec in the child
    pub cloexec_inherited_fds: bool,
    /// Ignore SIGINT/SIGQUIT in the parent while waiting
    pub defer_interrupts: bool,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        SpawnConfig::default().options()
    }
}

impl SpawnConfig {
    /// Load configuration from the process environment on top of defaults
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let cfg: SpawnConfig = toml::from_str(input)
            .map_err(|e| CoreError::ConfigurationError(format!("TOML parse error: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a TOML file path
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(&path).map_err(|e| {
            CoreError::ConfigurationError(format!(
                "Failed to read config {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_toml_str(&data)
    }

    /// Apply `CLEAN_SPAWN_*` variables from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flags: [(&str, &mut bool); 5] = [
            (ENV_SIGNAL_EXT, &mut self.signal_extension),
            (ENV_NEW_SESSION, &mut self.new_session),
            (ENV_RESET_SIGNALS, &mut self.reset_signals),
            (ENV_CLOEXEC_FDS, &mut self.cloexec_inherited_fds),
            (ENV_DEFER_INTERRUPTS, &mut self.defer_interrupts),
        ];
        for (key, slot) in flags {
            if let Some(raw) = lookup(key) {
                *slot = parse_flag(key, &raw)?;
            }
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = level;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration and return field-path errors
    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "log_level: cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-spawn options for this configuration
    pub fn options(&self) -> SpawnOptions {
        SpawnOptions {
            new_session: self.new_session,
            reset_signals: self.reset_signals,
            cloexec_inherited_fds: self.cloexec_inherited_fds,
            defer_interrupts: self.defer_interrupts,
        }
    }
}

/// Parse a boolean environment flag
///
/// Accepts `1/0`, `true/false`, `yes/no` and `on/off`, case-insensitively.
pub fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CoreError::ConfigurationError(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = SpawnConfig::default();
        assert!(!cfg.signal_extension);
        assert!(cfg.new_session);
        assert!(cfg.reset_signals);
        assert!(cfg.cloexec_inherited_fds);
        assert!(!cfg.defer_interrupts);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(SpawnOptions::default(), cfg.options());
    }

    #[test]
    fn test_empty_environment_keeps_defaults() {
        let cfg = SpawnConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, SpawnConfig::default());
    }

    #[test]
    fn test_signal_extension_flag() {
        let cfg = SpawnConfig::from_lookup(lookup_from(&[(ENV_SIGNAL_EXT, "1")])).unwrap();
        assert!(cfg.signal_extension);

        let cfg = SpawnConfig::from_lookup(lookup_from(&[(ENV_SIGNAL_EXT, "OFF")])).unwrap();
        assert!(!cfg.signal_extension);
    }

    #[test]
    fn test_all_flags_from_lookup() {
        let cfg = SpawnConfig::from_lookup(lookup_from(&[
            (ENV_NEW_SESSION, "no"),
            (ENV_RESET_SIGNALS, "false"),
            (ENV_CLOEXEC_FDS, "0"),
            (ENV_DEFER_INTERRUPTS, "Yes"),
            (ENV_LOG, "debug"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.options(),
            SpawnOptions {
                new_session: false,
                reset_signals: false,
                cloexec_inherited_fds: false,
                defer_interrupts: true,
            }
        );
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn test_invalid_flag_names_variable() {
        let err = SpawnConfig::from_lookup(lookup_from(&[(ENV_SIGNAL_EXT, "maybe")])).unwrap_err();
        assert!(matches!(err, CoreError::ConfigurationError(_)));
        assert!(err.to_string().contains(ENV_SIGNAL_EXT));
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let err = SpawnConfig::from_lookup(lookup_from(&[(ENV_LOG, "  ")])).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let cfg = SpawnConfig::from_toml_str("signal_extension = true\n").unwrap();
        assert!(cfg.signal_extension);
        assert!(cfg.new_session);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_toml_unknown_field_rejected() {
        let err = SpawnConfig::from_toml_str("new_sesion = false\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigurationError(_)));
    }

    #[test]
    fn test_environment_wins_over_file() {
        let file =
            SpawnConfig::from_toml_str("new_session = false\nlog_level = \"warn\"\n").unwrap();
        let cfg = file
            .with_overrides(lookup_from(&[(ENV_NEW_SESSION, "true")]))
            .unwrap();
        assert!(cfg.new_session);
        assert_eq!(cfg.log_level, "warn");
    }

    #[test]
    fn test_from_toml_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean-spawn.toml");
        fs::write(&path, "defer_interrupts = true\n").unwrap();
        let cfg = SpawnConfig::from_toml_path(&path).unwrap();
        assert!(cfg.defer_interrupts);

        let missing = SpawnConfig::from_toml_path(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(CoreError::ConfigurationError(_))));
    }
}
