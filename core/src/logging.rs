//! Tracing initialisation

use tracing::info;

/// Initialize tracing for the application
///
/// `RUST_LOG` takes precedence over `level` when it is set and valid.
pub fn init_tracing(level: &str) -> crate::Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

    info!("Tracing initialized with level: {}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        // Another test in this binary may already have installed a subscriber,
        // so only the second call is guaranteed to fail.
        let _ = init_tracing("debug");
        let err = init_tracing("debug").unwrap_err();
        assert_eq!(err.code(), "CORE003");
    }
}
