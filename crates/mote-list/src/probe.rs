//! Port existence probing
//!
//! Used to validate manually registered motes. Probing only opens and closes
//! the port; nothing is written to the device.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::FlowControl;
use tracing::trace;

/// Check whether a serial port can be opened
pub trait PortProbe: Send + Sync {
    fn port_exists(&self, port: &str) -> bool;
}

impl<F> PortProbe for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn port_exists(&self, port: &str) -> bool {
        self(port)
    }
}

/// Configuration for probing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Baud rate used when opening the port
    pub baud_rate: u32,
    /// Open timeout
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            baud_rate: 38400,
            timeout: Duration::ZERO,
        }
    }
}

/// Probe that opens the port with the `serialport` crate
#[derive(Debug, Clone, Default)]
pub struct SerialPortProbe {
    config: ProbeConfig,
}

impl SerialPortProbe {
    /// Create a prober with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prober with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }
}

impl PortProbe for SerialPortProbe {
    fn port_exists(&self, port: &str) -> bool {
        let result = serialport::new(port, self.config.baud_rate)
            .timeout(self.config.timeout)
            .flow_control(FlowControl::Hardware)
            .open();

        match result {
            // Dropping the handle closes the port
            Ok(_) => true,
            Err(e) => {
                trace!("Probe of {} failed: {}", port, e);
                false
            }
        }
    }
}
