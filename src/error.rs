//! Error types for mailrelay.

use thiserror::Error;

/// Common error type for mailrelay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for mailrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = RelayError::Validation("max_files must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: max_files must be positive"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = RelayError::Config("bad address".to_string());
        assert_eq!(err.to_string(), "configuration error: bad address");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RelayError = io_err.into();
        assert!(matches!(err, RelayError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<u16> {
            Ok(3000)
        }

        fn sample_err() -> Result<u16> {
            Err(RelayError::Config("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 3000);
        assert!(sample_err().is_err());
    }
}
