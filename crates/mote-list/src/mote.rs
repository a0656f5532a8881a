//! Device records
//!
//! A backend reports each visible device as a [`RawMote`]. The registry turns
//! those into [`Mote`] records, which carry identity, the manual flag and any
//! data the caller attached.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MoteError;

/// Reference value a backend reports for a port it could not describe.
///
/// Records carrying this reference are phantom ports and never become motes.
pub const NOT_AVAILABLE: &str = "n/a";

/// Host name some backends use for the machine running this process
pub const LOCAL_HOST: &str = "Local";

/// Device description as reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMote {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// Display name, usually the USB product string
    pub name: String,
    /// Serial number or other stable identifier
    pub reference: String,
    /// Secondary device path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Host the device is attached to; unset means this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl RawMote {
    /// Create a record for a local device without a secondary path
    pub fn new(
        port: impl Into<String>,
        name: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            port: port.into(),
            name: name.into(),
            reference: reference.into(),
            path: None,
            host: None,
        }
    }

    /// Set the secondary device path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the host the device is attached to
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Build a record from 3 to 5 positional fields:
    /// `port, name, reference[, path[, host]]`
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, MoteError> {
        let fields: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();
        match fields.as_slice() {
            &[port, name, reference] => Ok(Self::new(port, name, reference)),
            &[port, name, reference, path] => Ok(Self::new(port, name, reference).with_path(path)),
            &[port, name, reference, path, host] => Ok(Self::new(port, name, reference)
                .with_path(path)
                .with_host(host)),
            _ => Err(MoteError::InvalidFieldCount(fields.len())),
        }
    }

    /// Whether the backend failed to describe this port
    pub fn is_phantom(&self) -> bool {
        self.reference == NOT_AVAILABLE
    }
}

impl<S: Into<String>> From<(S, S, S)> for RawMote {
    fn from((port, name, reference): (S, S, S)) -> Self {
        Self::new(port, name, reference)
    }
}

impl<S: Into<String>> From<(S, S, S, S)> for RawMote {
    fn from((port, name, reference, path): (S, S, S, S)) -> Self {
        Self::new(port, name, reference).with_path(path)
    }
}

impl<S: Into<String>> From<(S, S, S, S, S)> for RawMote {
    fn from((port, name, reference, path, host): (S, S, S, S, S)) -> Self {
        Self::new(port, name, reference).with_path(path).with_host(host)
    }
}

/// Collapse a host name to the form used for identity.
///
/// Unset, empty and `Local` all mean this machine and normalize to `""`.
/// A `scheme://` prefix is dropped.
pub fn normalize_host(host: Option<&str>) -> &str {
    let host = match host {
        None => return "",
        Some(LOCAL_HOST) => return "",
        Some(h) => h,
    };
    match host.find("://") {
        Some(idx) => &host[idx + 3..],
        None => host,
    }
}

/// Identity of a mote: normalized host plus port.
///
/// Ordering is by host first, then port, both byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoteId {
    host: String,
    port: String,
}

impl MoteId {
    /// Identity of a port on the local machine
    pub fn local(port: impl Into<String>) -> Self {
        Self {
            host: String::new(),
            port: port.into(),
        }
    }

    /// Identity of a port on some host; the host is normalized
    pub fn new(host: Option<&str>, port: impl Into<String>) -> Self {
        Self {
            host: normalize_host(host).to_string(),
            port: port.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl fmt::Display for MoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            write!(f, "{}", self.port)
        } else {
            write!(f, "{} @ {}", self.port, self.host)
        }
    }
}

/// A tracked mote.
///
/// `U` is data the caller attaches to a mote; it is carried along while the
/// mote stays connected and is never inspected here.
///
/// `Mote` deliberately has no `PartialEq`: two records are the same mote when
/// [`Mote::same_mote`] says so, which ignores name and reference.
#[derive(Debug, Clone)]
pub struct Mote<U = ()> {
    port: String,
    name: String,
    reference: String,
    path: Option<String>,
    host: Option<String>,
    manual: bool,
    user_data: Option<U>,
}

impl<U> Mote<U> {
    /// Create a mote discovered by a backend scan
    pub fn discovered(raw: RawMote) -> Self {
        Self::from_raw(raw, false)
    }

    /// Create a mote registered by the caller
    pub fn manual(raw: RawMote) -> Self {
        Self::from_raw(raw, true)
    }

    fn from_raw(raw: RawMote, manual: bool) -> Self {
        Self {
            port: raw.port,
            name: raw.name,
            reference: raw.reference,
            path: raw.path,
            host: raw.host,
            manual,
            user_data: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Host as reported, or `""` when unset
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("")
    }

    /// Whether the mote is attached to the machine running this process
    pub fn is_local(&self) -> bool {
        normalize_host(self.host.as_deref()).is_empty()
    }

    /// Whether the mote was registered manually rather than discovered
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn user_data(&self) -> Option<&U> {
        self.user_data.as_ref()
    }

    pub fn set_user_data(&mut self, data: U) {
        self.user_data = Some(data);
    }

    pub fn take_user_data(&mut self) -> Option<U> {
        self.user_data.take()
    }

    /// Identity key of this mote
    pub fn id(&self) -> MoteId {
        MoteId::new(self.host.as_deref(), self.port.clone())
    }

    /// Whether this mote has the given identity
    pub fn has_id(&self, id: &MoteId) -> bool {
        normalize_host(self.host.as_deref()) == id.host() && self.port == id.port()
    }

    /// Whether both records refer to the same physical mote
    pub fn same_mote<V>(&self, other: &Mote<V>) -> bool {
        self.cmp_identity(other) == Ordering::Equal
    }

    /// Total order by normalized host, then port
    pub fn cmp_identity<V>(&self, other: &Mote<V>) -> Ordering {
        normalize_host(self.host.as_deref())
            .cmp(normalize_host(other.host.as_deref()))
            .then_with(|| self.port.cmp(&other.port))
    }
}
