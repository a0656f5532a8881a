//! Error types for mote tracking

use thiserror::Error;

/// Errors raised by a device discovery backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// No discovery mechanism exists for this platform
    #[error("platform not supported: {0}")]
    Unsupported(String),

    /// Failed to enumerate ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// Serial port error
    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),
}

/// Errors surfaced by the mote registry and poller
#[derive(Debug, Error)]
pub enum MoteError {
    /// The discovery backend cannot run on this platform
    #[error("OS not supported: {0}")]
    UnsupportedPlatform(String),

    /// Periodic polling needs a tokio runtime
    #[error("periodic update requires a running tokio runtime")]
    RuntimeUnavailable,

    /// A raw device record must carry 3 to 5 fields
    #[error("failed to initialize mote from {0} field(s), expected 3 to 5")]
    InvalidFieldCount(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MoteError::UnsupportedPlatform("plan9".into());
        assert_eq!(err.to_string(), "OS not supported: plan9");

        let err = MoteError::InvalidFieldCount(2);
        assert_eq!(
            err.to_string(),
            "failed to initialize mote from 2 field(s), expected 3 to 5"
        );
    }

    #[test]
    fn test_backend_error_messages() {
        let err = BackendError::EnumerationFailed("ioreg missing".into());
        assert_eq!(err.to_string(), "failed to enumerate ports: ioreg missing");
    }

    #[test]
    fn test_serialport_error_conversion() {
        let err = BackendError::from(serialport::Error::new(
            serialport::ErrorKind::NoDevice,
            "udev unavailable",
        ));
        assert!(matches!(err, BackendError::SerialPort(_)));
        assert_eq!(err.to_string(), "serial port error: udev unavailable");
    }
}
