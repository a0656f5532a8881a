//! USB Vendor/Product IDs of serial bridges commonly found on motes
//!
//! Sensor-network boards expose their console through either a dedicated
//! USB-serial bridge chip or a CDC-ACM interface on the microcontroller.

/// FTDI (Future Technology Devices International)
pub mod ftdi {
    pub const VID: u16 = 0x0403;

    /// FT232R, FT2232 (TelosB/Tmote Sky, Z1), FT4232, FT232H, FT231X
    pub const ALL_PIDS: &[u16] = &[0x6001, 0x6010, 0x6011, 0x6014, 0x6015];
}

/// Silicon Labs CP210x (Zolertia RE-Mote, Firefly, many dev kits)
pub mod cp210x {
    pub const VID: u16 = 0x10C4;

    pub const ALL_PIDS: &[u16] = &[0xEA60, 0xEA70, 0xEA71];
}

/// WCH CH340/CH341
pub mod ch340 {
    pub const VID: u16 = 0x1A86;

    pub const ALL_PIDS: &[u16] = &[0x7523, 0x5523];
}

/// Prolific PL2303
pub mod prolific {
    pub const VID: u16 = 0x067B;

    pub const ALL_PIDS: &[u16] = &[0x2303];
}

/// Texas Instruments LaunchPads and SmartRF boards (XDS110, CC2538 USB CDC)
pub mod ti {
    pub const VID: u16 = 0x0451;

    pub const ALL_PIDS: &[u16] = &[0xBEF3, 0x16C8, 0x16A8];
}

/// Nordic Semiconductor dongles and DKs in CDC-ACM mode
pub mod nordic {
    pub const VID: u16 = 0x1915;
}

/// SEGGER J-Link virtual COM ports (nRF52 DKs and others)
pub mod segger {
    pub const VID: u16 = 0x1366;
}

/// Check if a VID/PID belongs to a known USB-serial bridge or mote console
pub fn is_known_adapter(vid: u16, pid: u16) -> bool {
    match vid {
        ftdi::VID => ftdi::ALL_PIDS.contains(&pid),
        cp210x::VID => cp210x::ALL_PIDS.contains(&pid),
        ch340::VID => ch340::ALL_PIDS.contains(&pid),
        prolific::VID => prolific::ALL_PIDS.contains(&pid),
        ti::VID => ti::ALL_PIDS.contains(&pid),
        nordic::VID | segger::VID => true,
        _ => false,
    }
}

/// Get adapter type name from VID
pub fn adapter_name(vid: u16) -> Option<&'static str> {
    match vid {
        ftdi::VID => Some("FTDI"),
        cp210x::VID => Some("CP210x"),
        ch340::VID => Some("CH340"),
        prolific::VID => Some("PL2303"),
        ti::VID => Some("TI USB"),
        nordic::VID => Some("Nordic USB"),
        segger::VID => Some("J-Link"),
        _ => None,
    }
}
