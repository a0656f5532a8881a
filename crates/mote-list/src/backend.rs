//! Device discovery backends
//!
//! A backend returns the devices currently visible to it as raw records.
//! An empty list means no devices, not an error.

use tracing::debug;

use crate::error::{BackendError, MoteError};
use crate::mote::RawMote;
use crate::scanner::{ScannerConfig, SerialBackend};

/// Source of raw device snapshots
pub trait Backend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str {
        "custom"
    }

    /// List the devices visible right now
    fn comports(&self) -> Result<Vec<RawMote>, BackendError>;
}

impl<F> Backend for F
where
    F: Fn() -> Result<Vec<RawMote>, BackendError> + Send + Sync,
{
    fn comports(&self) -> Result<Vec<RawMote>, BackendError> {
        self()
    }
}

/// Resolve the discovery backend for the current platform
pub fn detect() -> Result<Box<dyn Backend>, MoteError> {
    detect_with_config(ScannerConfig::default())
}

/// Resolve the platform backend with a custom scanner configuration
pub fn detect_with_config(config: ScannerConfig) -> Result<Box<dyn Backend>, MoteError> {
    if cfg!(any(target_os = "linux", target_os = "macos", target_os = "windows")) {
        debug!("Using serial port backend for {}", std::env::consts::OS);
        Ok(Box::new(SerialBackend::with_config(config)))
    } else {
        Err(MoteError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }
}
