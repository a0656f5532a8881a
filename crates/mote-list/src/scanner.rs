//! Serial port backend
//!
//! Enumerates serial ports through the `serialport` crate and describes each
//! USB port as a raw mote record.

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortType, UsbPortInfo};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::error::BackendError;
use crate::mote::{RawMote, NOT_AVAILABLE};
use crate::usb_ids;

/// Serial port backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Skip ports whose name contains any of these patterns
    pub skip_patterns: Vec<String>,
    /// Report only ports behind a known USB-serial bridge
    #[serde(default)]
    pub only_known_adapters: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            skip_patterns: vec![
                // Bluetooth ports on macOS
                "Bluetooth".to_string(),
                // Debug/logging ports
                "debug".to_string(),
            ],
            only_known_adapters: false,
        }
    }
}

/// Backend listing local serial ports
#[derive(Debug, Clone, Default)]
pub struct SerialBackend {
    config: ScannerConfig,
}

impl SerialBackend {
    /// Create a backend with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Convert one enumerated port, or `None` if configuration excludes it
    fn describe(&self, port: String, port_type: &SerialPortType) -> Option<RawMote> {
        if self.should_skip_port(&port) {
            return None;
        }

        match port_type {
            SerialPortType::UsbPort(usb) => {
                if self.config.only_known_adapters && !usb_ids::is_known_adapter(usb.vid, usb.pid) {
                    debug!("Skipping {}: unknown adapter {:04x}:{:04x}", port, usb.vid, usb.pid);
                    return None;
                }
                Some(describe_usb(port, usb))
            }
            _ if self.config.only_known_adapters => None,
            // Not a USB device, so not a mote; the reconciler drops these
            _ => Some(RawMote::new(port.clone(), port, NOT_AVAILABLE)),
        }
    }

    fn should_skip_port(&self, port: &str) -> bool {
        self.config
            .skip_patterns
            .iter()
            .any(|pattern| port.contains(pattern.as_str()))
    }
}

/// Describe a USB serial port as `(port, product, "VID=.. PID=.. Serial=.. Vendor=..")`
fn describe_usb(port: String, usb: &UsbPortInfo) -> RawMote {
    let name = usb
        .product
        .clone()
        .or_else(|| usb_ids::adapter_name(usb.vid).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let reference = format!(
        "VID=0x{:04X} PID=0x{:04X} Serial={} Vendor={}",
        usb.vid,
        usb.pid,
        usb.serial_number.as_deref().unwrap_or("unknown"),
        usb.manufacturer.as_deref().unwrap_or("unknown"),
    );

    RawMote::new(port, name, reference)
}

impl Backend for SerialBackend {
    fn name(&self) -> &str {
        "serialport"
    }

    fn comports(&self) -> Result<Vec<RawMote>, BackendError> {
        debug!("Enumerating serial ports...");
        let ports = available_ports()?;

        let result: Vec<_> = ports
            .into_iter()
            .filter_map(|p| self.describe(p.port_name, &p.port_type))
            .collect();

        let usable = result.iter().filter(|m| !m.is_phantom()).count();
        if usable == 0 {
            debug!("No USB serial ports found");
        } else {
            info!("Found {} USB serial port(s)", usable);
            for port in result.iter().filter(|m| !m.is_phantom()) {
                debug!("  {} - {}", port.port, port.name);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp2102() -> SerialPortType {
        SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x10C4,
            pid: 0xEA60,
            serial_number: Some("0001".to_string()),
            manufacturer: Some("Silicon Labs".to_string()),
            product: Some("Zolertia RE-Mote platform".to_string()),
        })
    }

    #[test]
    fn test_usb_port_description() {
        let backend = SerialBackend::new();
        let raw = backend
            .describe("/dev/ttyUSB0".to_string(), &cp2102())
            .unwrap();

        assert_eq!(raw.port, "/dev/ttyUSB0");
        assert_eq!(raw.name, "Zolertia RE-Mote platform");
        assert_eq!(
            raw.reference,
            "VID=0x10C4 PID=0xEA60 Serial=0001 Vendor=Silicon Labs"
        );
        assert!(!raw.is_phantom());
    }

    #[test]
    fn test_missing_product_falls_back_to_adapter() {
        let usb = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x0403,
            pid: 0x6001,
            serial_number: None,
            manufacturer: None,
            product: None,
        });
        let raw = SerialBackend::new()
            .describe("/dev/ttyUSB1".to_string(), &usb)
            .unwrap();
        assert_eq!(raw.name, "FTDI");
        assert_eq!(
            raw.reference,
            "VID=0x0403 PID=0x6001 Serial=unknown Vendor=unknown"
        );
    }

    #[test]
    fn test_non_usb_port_is_phantom() {
        let raw = SerialBackend::new()
            .describe("/dev/ttyS0".to_string(), &SerialPortType::Unknown)
            .unwrap();
        assert!(raw.is_phantom());
    }

    #[test]
    fn test_skip_patterns() {
        let backend = SerialBackend::new();
        assert!(backend
            .describe("/dev/tty.Bluetooth-Incoming-Port".to_string(), &cp2102())
            .is_none());
    }

    #[test]
    fn test_only_known_adapters() {
        let backend = SerialBackend::with_config(ScannerConfig {
            only_known_adapters: true,
            ..Default::default()
        });
        let unknown = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x1234,
            pid: 0x5678,
            serial_number: None,
            manufacturer: None,
            product: Some("Mystery".to_string()),
        });

        assert!(backend.describe("/dev/ttyUSB0".to_string(), &cp2102()).is_some());
        assert!(backend.describe("/dev/ttyUSB1".to_string(), &unknown).is_none());
        assert!(backend
            .describe("/dev/ttyS0".to_string(), &SerialPortType::Unknown)
            .is_none());
    }
}
