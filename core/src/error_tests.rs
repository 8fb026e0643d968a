#[cfg(test)]
mod tests {
    use crate::error::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_core_error_display() {
        let err = CoreError::ValidationError("log_level: cannot be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: log_level: cannot be empty");

        let err = CoreError::ConfigurationError("bad flag".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad flag");

        let err = CoreError::InitializationError("subscriber already set".to_string());
        assert_eq!(err.to_string(), "Initialization error: subscriber already set");

        let err = CoreError::Other("generic error".to_string());
        assert_eq!(err.to_string(), "Generic error: generic error");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CoreError::ConfigurationError("test".to_string()).code(),
            "CORE001"
        );
        assert_eq!(CoreError::ValidationError("test".to_string()).code(), "CORE002");
        assert_eq!(
            CoreError::InitializationError("test".to_string()).code(),
            "CORE003"
        );
        assert_eq!(CoreError::Signal(nix::errno::Errno::EINVAL).code(), "CORE004");
        assert_eq!(CoreError::Other("test".to_string()).code(), "CORE999");
    }

    #[test]
    fn test_spawn_failure_keeps_source() {
        let failure = SpawnFailure::Spawn {
            program: "/no/such/binary".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(failure.program(), "/no/such/binary");
        assert_eq!(failure.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(failure.source().is_some());

        let core_err: CoreError = failure.into();
        assert_eq!(core_err.code(), "CORE005");
        assert!(core_err.to_string().contains("/no/such/binary"));
    }

    #[test]
    fn test_signal_failure_has_no_io_kind() {
        let failure = SpawnFailure::Signal {
            program: "sh".to_string(),
            source: nix::errno::Errno::EINVAL,
        };
        assert_eq!(failure.io_kind(), None);
        assert!(failure.to_string().starts_with("failed to adjust signal dispositions"));
    }

    #[test]
    fn test_core_error_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::IoError(_)));
    }

    #[test]
    fn test_from_implementations() {
        let error: CoreError = "test error".into();
        assert_eq!(error.to_string(), "Generic error: test error");

        let error: CoreError = "test error".to_string().into();
        assert_eq!(error.to_string(), "Generic error: test error");
    }
}
