//! Human-readable mote list output

use std::fmt;

use crate::mote::{Mote, LOCAL_HOST};

/// Placeholder row shown when no motes are attached.
///
/// Presentation only; never stored in a registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMotes;

impl NoMotes {
    pub const NAME: &'static str = "No motes found!";
    pub const HINT: &'static str = "Make sure mote(s) are connected and drivers are installed.";
}

impl fmt::Display for NoMotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", Self::NAME, Self::HINT)
    }
}

/// Host column text: `Local` for motes on this machine, otherwise the
/// host as reported
pub fn host_label<U>(mote: &Mote<U>) -> &str {
    if mote.is_local() {
        LOCAL_HOST
    } else {
        mote.host()
    }
}

/// Name with the port appended unless the name already contains it,
/// followed by `@ host`
pub fn nice_name<U>(mote: &Mote<U>) -> String {
    if mote.name().contains(mote.port()) {
        format!("{} @ {}", mote.name(), host_label(mote))
    } else {
        format!("{}({}) @ {}", mote.name(), mote.port(), host_label(mote))
    }
}

/// Nice name followed by the reference in brackets
pub fn full_name<U>(mote: &Mote<U>) -> String {
    format!("{} [{}]", nice_name(mote), mote.reference())
}

/// One CSV line: reference, port, name, path, host
pub fn csv_row<U>(mote: &Mote<U>) -> String {
    format!(
        "{},{},{},{},{}",
        mote.reference(),
        mote.port(),
        mote.name(),
        mote.path().unwrap_or(""),
        host_label(mote)
    )
}

/// CSV listing with an optional header row
pub fn format_csv<U>(motes: &[Mote<U>], omit_header: bool) -> String {
    let mut out = String::new();
    if !omit_header {
        out.push_str("Reference,Port,Name,Path,Host\n");
    }
    for mote in motes {
        out.push_str(&csv_row(mote));
        out.push('\n');
    }
    out
}

/// One port per line
pub fn format_brief<U>(motes: &[Mote<U>]) -> String {
    motes.iter().map(|m| format!("{}\n", m.port())).collect()
}

/// Aligned Reference/Port/Host/Name table
pub fn format_table<U>(motes: &[Mote<U>], omit_header: bool) -> String {
    if motes.is_empty() {
        return "No attached motes found!\n".to_string();
    }

    let headers = ["Reference", "Port", "Host", "Name"];
    let rows: Vec<[&str; 4]> = motes
        .iter()
        .map(|m| [m.reference(), m.port(), host_label(m), m.name()])
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    if !omit_header {
        push_row(&mut out, &headers, &widths);
        let separator = widths.map(|w| "-".repeat(w));
        push_row(&mut out, &separator.each_ref().map(String::as_str), &widths);
    }
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[&str; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mote::RawMote;

    fn mote(raw: impl Into<RawMote>) -> Mote {
        Mote::discovered(raw.into())
    }

    #[test]
    fn test_nice_name() {
        assert_eq!(
            nice_name(&mote(("/dev/ttyUSB0", "CP2102", "SN1"))),
            "CP2102(/dev/ttyUSB0) @ Local"
        );
        assert_eq!(
            nice_name(&mote(("COM3", "USB Serial (COM3)", "SN1"))),
            "USB Serial (COM3) @ Local"
        );
        assert_eq!(
            nice_name(&mote(("/dev/ttyUSB0", "CP2102", "SN1", "", "lab"))),
            "CP2102(/dev/ttyUSB0) @ lab"
        );
    }

    #[test]
    fn test_full_name() {
        assert_eq!(
            full_name(&mote(("/dev/ttyUSB0", "CP2102", "SN1"))),
            "CP2102(/dev/ttyUSB0) @ Local [SN1]"
        );
    }

    #[test]
    fn test_csv() {
        let motes = vec![
            mote(("/dev/ttyUSB0", "CP2102", "SN1")),
            mote(("/dev/ttyUSB1", "FT232R", "SN2", "/sys/x", "lab")),
        ];
        assert_eq!(
            format_csv(&motes, true),
            "SN1,/dev/ttyUSB0,CP2102,,Local\nSN2,/dev/ttyUSB1,FT232R,/sys/x,lab\n"
        );
        assert!(format_csv(&motes, false).starts_with("Reference,Port,Name,Path,Host\n"));
    }

    #[test]
    fn test_brief() {
        let motes = vec![mote(("/dev/ttyUSB0", "A", "1")), mote(("/dev/ttyUSB1", "B", "2"))];
        assert_eq!(format_brief(&motes), "/dev/ttyUSB0\n/dev/ttyUSB1\n");
    }

    #[test]
    fn test_table() {
        let motes = vec![mote(("/dev/ttyUSB0", "CP2102", "SN1"))];
        let table = format_table(&motes, false);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "Reference  Port          Host   Name");
        assert_eq!(lines[1], "---------  ------------  -----  ------");
        assert_eq!(lines[2], "SN1        /dev/ttyUSB0  Local  CP2102");
    }

    #[test]
    fn test_host_label() {
        let local = mote(RawMote::new("/dev/ttyUSB0", "A", "1").with_host("Local"));
        let remote = mote(RawMote::new("/dev/ttyUSB0", "A", "1").with_host("tcp://lab"));
        assert_eq!(host_label(&mote(("/dev/ttyUSB0", "A", "1"))), "Local");
        assert_eq!(host_label(&local), "Local");
        assert_eq!(host_label(&remote), "tcp://lab");
    }

    #[test]
    fn test_empty_table() {
        let motes: Vec<Mote> = Vec::new();
        assert_eq!(format_table(&motes, false), "No attached motes found!\n");
    }

    #[test]
    fn test_no_motes_placeholder() {
        assert_eq!(
            NoMotes.to_string(),
            "No motes found! [Make sure mote(s) are connected and drivers are installed.]"
        );
    }
}
