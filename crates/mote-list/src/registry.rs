//! Shared mote list and update callbacks
//!
//! The registry owns the authoritative mote list and the subscriber set,
//! both behind one mutex. The lock is only held to read or swap data: backend
//! queries, port probes and callbacks all run outside it, so a callback may
//! call back into the registry.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::backend::{self, Backend};
use crate::error::{BackendError, MoteError};
use crate::mote::{Mote, MoteId, RawMote};
use crate::probe::{PortProbe, SerialPortProbe};
use crate::reconcile::reconcile;

/// Error type update callbacks may return
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of update callbacks
pub type CallbackResult = Result<(), CallbackError>;

type Callback = Arc<dyn Fn() -> CallbackResult + Send + Sync>;

/// Handle returned by [`Registry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a manually added port is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualPortCheck {
    /// Do not probe the port
    Off,
    /// Probe the port and log a warning if it cannot be opened
    #[default]
    Advisory,
    /// Refuse to add a port that cannot be opened
    Strict,
}

/// What a poll cycle does when the backend query fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendFailurePolicy {
    /// Treat the cycle as if no devices were found
    #[default]
    EmptySnapshot,
    /// Leave the list untouched until the next cycle
    SkipCycle,
}

/// Registry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub manual_port_check: ManualPortCheck,
    #[serde(default)]
    pub backend_failure: BackendFailurePolicy,
}

struct RegistryState<U> {
    motes: Vec<Mote<U>>,
    subscribers: Vec<(SubscriptionId, Callback)>,
    /// Bumped every time `motes` changes
    generation: u64,
    next_subscription: u64,
}

impl<U> RegistryState<U> {
    fn subscribers(&self) -> Vec<(SubscriptionId, Callback)> {
        self.subscribers.clone()
    }
}

/// Thread-safe authoritative list of attached motes
pub struct Registry<U = ()> {
    backend: Box<dyn Backend>,
    probe: Box<dyn PortProbe>,
    config: RegistryConfig,
    state: Mutex<RegistryState<U>>,
}

impl<U> Registry<U> {
    /// Create a registry around a backend with default configuration
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self::from_boxed(Box::new(backend), RegistryConfig::default())
    }

    /// Create a registry around a backend with custom configuration
    pub fn with_config<B: Backend + 'static>(backend: B, config: RegistryConfig) -> Self {
        Self::from_boxed(Box::new(backend), config)
    }

    /// Create a registry around an already boxed backend
    pub fn from_boxed(backend: Box<dyn Backend>, config: RegistryConfig) -> Self {
        Self {
            backend,
            probe: Box::new(SerialPortProbe::new()),
            config,
            state: Mutex::new(RegistryState {
                motes: Vec::new(),
                subscribers: Vec::new(),
                generation: 0,
                next_subscription: 0,
            }),
        }
    }

    /// Create a registry using the backend for the current platform
    pub fn detect() -> Result<Self, MoteError> {
        Ok(Self::from_boxed(backend::detect()?, RegistryConfig::default()))
    }

    /// Replace the port probe used to validate manual motes
    pub fn with_probe<P: PortProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState<U>> {
        // Callbacks never run under the lock, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a mote by hand.
    ///
    /// Returns `false` if a mote with the same local port is already listed,
    /// or if strict port checking is enabled and the port cannot be opened.
    /// Subscribers are notified whenever a mote is added.
    pub fn add_manual_mote(
        &self,
        port: impl Into<String>,
        name: impl Into<String>,
        reference: impl Into<String>,
    ) -> bool {
        let port = port.into();

        match self.config.manual_port_check {
            ManualPortCheck::Off => {}
            ManualPortCheck::Advisory => {
                if !self.probe.port_exists(&port) {
                    warn!("Port {} could not be opened, adding it anyway", port);
                }
            }
            ManualPortCheck::Strict => {
                if !self.probe.port_exists(&port) {
                    warn!("Port {} could not be opened, not adding it", port);
                    return false;
                }
            }
        }

        let id = MoteId::local(port.clone());
        let callbacks = {
            let mut state = self.lock();
            if state.motes.iter().any(|m| m.has_id(&id)) {
                debug!("Mote {} is already listed", id);
                return false;
            }

            let mote = Mote::manual(RawMote::new(port, name, reference));
            let index = state
                .motes
                .partition_point(|m| m.cmp_identity(&mote) == Ordering::Less);
            state.motes.insert(index, mote);
            state.generation += 1;
            state.subscribers()
        };

        info!("Added manual mote {}", id);
        dispatch(&callbacks);
        true
    }

    /// Run one poll cycle: query the backend, merge, and notify subscribers
    /// if the list changed or `force` is set.
    ///
    /// Returns whether the list changed. Fails only when the backend reports
    /// that the platform is unsupported.
    pub fn run_once(&self, force: bool) -> Result<bool, MoteError> {
        let snapshot = match self.backend.comports() {
            Ok(snapshot) => Some(snapshot),
            Err(BackendError::Unsupported(os)) => {
                return Err(MoteError::UnsupportedPlatform(os));
            }
            Err(e) => match self.config.backend_failure {
                BackendFailurePolicy::EmptySnapshot => {
                    warn!("{} backend failed, treating as no motes: {}", self.backend.name(), e);
                    Some(Vec::new())
                }
                BackendFailurePolicy::SkipCycle => {
                    warn!("{} backend failed, skipping update: {}", self.backend.name(), e);
                    None
                }
            },
        };

        let (changed, added, removed, callbacks) = {
            let mut state = self.lock();
            let (changed, added, removed) = match snapshot {
                Some(snapshot) => {
                    let previous = std::mem::take(&mut state.motes);
                    let result = reconcile(previous, snapshot);
                    state.motes = result.motes;
                    if result.changed {
                        state.generation += 1;
                    }
                    (result.changed, result.added, result.removed)
                }
                None => (false, Vec::new(), Vec::new()),
            };

            let callbacks = if changed || force {
                state.subscribers()
            } else {
                Vec::new()
            };
            (changed, added, removed, callbacks)
        };

        for id in &added {
            info!("Mote attached: {}", id);
        }
        for id in &removed {
            info!("Mote detached: {}", id);
        }
        trace!("Update cycle done (changed: {}, forced: {})", changed, force);

        if changed || force {
            dispatch(&callbacks);
        }
        Ok(changed)
    }

    /// Subscribe to list changes
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscribers.push((id, Arc::new(callback)));
        debug!("Added update callback {}", id);
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(sub, _)| *sub != id);
        state.subscribers.len() != before
    }

    /// Attach caller data to a listed mote. Returns `false` if no mote has this id.
    pub fn set_user_data(&self, id: &MoteId, data: U) -> bool {
        let mut state = self.lock();
        match state.motes.iter_mut().find(|m| m.has_id(id)) {
            Some(mote) => {
                mote.set_user_data(data);
                true
            }
            None => false,
        }
    }

    /// Detach and return the caller data of a listed mote
    pub fn take_user_data(&self, id: &MoteId) -> Option<U> {
        let mut state = self.lock();
        state
            .motes
            .iter_mut()
            .find(|m| m.has_id(id))
            .and_then(Mote::take_user_data)
    }

    /// Number of completed list changes since creation
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn len(&self) -> usize {
        self.lock().motes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().motes.is_empty()
    }
}

impl<U: Clone> Registry<U> {
    /// Copy of the current list, optionally running a poll cycle first
    pub fn get_list(&self, refresh: bool) -> Result<Vec<Mote<U>>, MoteError> {
        if refresh {
            self.run_once(false)?;
        }
        Ok(self.lock().motes.clone())
    }

    /// Motes carrying the given caller data
    pub fn get_by_user_data(&self, data: &U) -> Vec<Mote<U>>
    where
        U: PartialEq,
    {
        self.lock()
            .motes
            .iter()
            .filter(|m| m.user_data() == Some(data))
            .cloned()
            .collect()
    }
}

impl<U> fmt::Debug for Registry<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Registry")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("motes", &state.motes.len())
            .field("subscribers", &state.subscribers.len())
            .field("generation", &state.generation)
            .finish()
    }
}

/// Invoke every callback, isolating errors and panics.
///
/// Returns the number of callbacks that failed.
fn dispatch(callbacks: &[(SubscriptionId, Callback)]) -> usize {
    let mut failures = 0;
    for (id, callback) in callbacks {
        match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failures += 1;
                error!("Update callback {} failed: {}", id, e);
            }
            Err(payload) => {
                failures += 1;
                error!("Update callback {} panicked: {}", id, panic_message(&*payload));
            }
        }
    }
    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn empty_backend() -> Result<Vec<RawMote>, BackendError> {
        Ok(Vec::new())
    }

    fn callback<F>(f: F) -> Callback
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn no_probe() -> RegistryConfig {
        RegistryConfig {
            manual_port_check: ManualPortCheck::Off,
            ..Default::default()
        }
    }

    #[test]
    fn test_dispatch_counts_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let callbacks: Vec<(SubscriptionId, Callback)> = vec![
            (SubscriptionId(0), callback(|| Err("boom".into()))),
            (SubscriptionId(1), callback(|| panic!("callback panic"))),
            (
                SubscriptionId(2),
                callback(move || {
                    counter.fetch_add(1, AtomicOrdering::SeqCst);
                    Ok(())
                }),
            ),
        ];

        assert_eq!(dispatch(&callbacks), 2);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_manual_mote_is_sorted_in() {
        let registry: Registry = Registry::with_config(empty_backend, no_probe());
        assert!(registry.add_manual_mote("/dev/ttyUSB1", "B", "2"));
        assert!(registry.add_manual_mote("/dev/ttyACM0", "A", "1"));

        let list = registry.get_list(false).unwrap();
        let ports: Vec<_> = list.iter().map(|m| m.port()).collect();
        assert_eq!(ports, vec!["/dev/ttyACM0", "/dev/ttyUSB1"]);
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn test_strict_check_rejects_missing_port() {
        let config = RegistryConfig {
            manual_port_check: ManualPortCheck::Strict,
            ..Default::default()
        };
        let registry: Registry =
            Registry::with_config(empty_backend, config).with_probe(|_: &str| false);
        assert!(!registry.add_manual_mote("/dev/ttyACM0", "A", "1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_advisory_check_still_adds() {
        let registry: Registry = Registry::new(empty_backend).with_probe(|_: &str| false);
        assert!(registry.add_manual_mote("/dev/ttyACM0", "A", "1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let registry: Registry = Registry::new(empty_backend);
        let id = registry.subscribe(|| Ok(()));
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(!registry.unsubscribe(SubscriptionId(99)));
    }

    #[test]
    fn test_user_data_attach_and_take() {
        let registry: Registry<u32> = Registry::with_config(empty_backend, no_probe());
        registry.add_manual_mote("/dev/ttyACM0", "A", "1");

        let id = MoteId::local("/dev/ttyACM0");
        assert!(registry.set_user_data(&id, 5));
        assert!(!registry.set_user_data(&MoteId::local("/dev/ttyACM9"), 5));
        assert_eq!(registry.get_by_user_data(&5).len(), 1);
        assert_eq!(registry.take_user_data(&id), Some(5));
        assert!(registry.get_by_user_data(&5).is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{ "manual_port_check": "strict" }"#).unwrap();
        assert_eq!(config.manual_port_check, ManualPortCheck::Strict);
        assert_eq!(config.backend_failure, BackendFailurePolicy::EmptySnapshot);

        let config: RegistryConfig =
            serde_json::from_str(r#"{ "backend_failure": "skip_cycle" }"#).unwrap();
        assert_eq!(config.backend_failure, BackendFailurePolicy::SkipCycle);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&3u8), "unknown panic");
    }
}
