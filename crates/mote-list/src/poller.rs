//! Periodic mote list updates
//!
//! The poller runs one registry update cycle, waits for the configured
//! interval, and repeats until stopped. Backend queries run on tokio's
//! blocking pool since they may shell out or touch the filesystem.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::MoteError;
use crate::registry::Registry;

/// Poller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay between update cycles
    pub interval: Duration,
}

impl PollerConfig {
    /// Shortest delay between update cycles a poller accepts
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

struct PollerTask {
    active: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background task keeping a [`Registry`] up to date
pub struct Poller<U = ()> {
    registry: Arc<Registry<U>>,
    config: PollerConfig,
    task: Mutex<Option<PollerTask>>,
}

impl<U: Send + 'static> Poller<U> {
    /// Create a stopped poller with default configuration
    pub fn new(registry: Arc<Registry<U>>) -> Self {
        Self::with_config(registry, PollerConfig::default())
    }

    /// Create a stopped poller with custom configuration.
    ///
    /// Intervals below [`PollerConfig::MIN_INTERVAL`] are raised to it.
    pub fn with_config(registry: Arc<Registry<U>>, mut config: PollerConfig) -> Self {
        if config.interval < PollerConfig::MIN_INTERVAL {
            warn!(
                "Update interval {:?} too short, using {:?}",
                config.interval,
                PollerConfig::MIN_INTERVAL
            );
            config.interval = PollerConfig::MIN_INTERVAL;
        }
        Self {
            registry,
            config,
            task: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<Registry<U>> {
        &self.registry
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<PollerTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the update loop is running
    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|task| task.active.load(Ordering::SeqCst))
    }

    /// Start periodic updates on the current tokio runtime.
    ///
    /// Returns `false` if the poller was already running. After a
    /// [`stop`](Self::stop) the new loop only begins once the previous one
    /// has finished its current cycle, so update cycles never overlap.
    pub fn start(&self) -> Result<bool, MoteError> {
        let runtime = Handle::try_current().map_err(|_| MoteError::RuntimeUnavailable)?;

        let mut task = self.lock_task();
        if task
            .as_ref()
            .is_some_and(|t| t.active.load(Ordering::SeqCst))
        {
            return Ok(false);
        }
        let previous = task
            .take()
            .map(|t| t.handle)
            .filter(|handle| !handle.is_finished());

        let active = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = watch::channel(false);
        let registry = self.registry.clone();
        let interval = self.config.interval;
        let loop_active = active.clone();
        let handle = runtime.spawn(async move {
            if let Some(previous) = previous {
                debug!("Waiting for previous update loop to exit");
                if let Err(e) = previous.await {
                    error!("Mote list update task failed: {}", e);
                }
            }
            poll_loop(registry, interval, loop_active, stop_rx).await;
        });

        *task = Some(PollerTask {
            active,
            stop_tx,
            handle,
        });
        info!(
            "Started periodic mote list update every {:?}",
            self.config.interval
        );
        Ok(true)
    }

    /// Ask the update loop to exit. Does not wait for it.
    ///
    /// Returns `false` if the poller was not running.
    pub fn stop(&self) -> bool {
        match self.lock_task().as_ref() {
            Some(task) => self.signal(task),
            None => false,
        }
    }

    /// Stop the update loop and wait until it has exited
    pub async fn shutdown(&self) {
        let task = self.lock_task().take();
        if let Some(task) = task {
            self.signal(&task);
            if let Err(e) = task.handle.await {
                error!("Mote list update task failed: {}", e);
            }
        }
    }

    fn signal(&self, task: &PollerTask) -> bool {
        let was_running = task.active.swap(false, Ordering::SeqCst);
        // The loop may already have exited and dropped its receiver
        let _ = task.stop_tx.send(true);
        if was_running {
            info!("Stopping periodic mote list update");
        }
        was_running
    }
}

async fn poll_loop<U: Send + 'static>(
    registry: Arc<Registry<U>>,
    interval: Duration,
    active: Arc<AtomicBool>,
    mut stop_rx: watch::Receiver<bool>,
) {
    while active.load(Ordering::SeqCst) {
        let cycle = registry.clone();
        match tokio::task::spawn_blocking(move || cycle.run_once(false)).await {
            Ok(Ok(changed)) => trace!("Periodic update done (changed: {})", changed),
            Ok(Err(e)) => {
                error!("Stopping periodic mote list update: {}", e);
                active.store(false, Ordering::SeqCst);
                break;
            }
            Err(e) => error!("Mote list update cycle failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_rx.changed() => break,
        }
    }
    debug!("Periodic mote list update stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::mote::RawMote;

    fn empty_backend() -> Result<Vec<RawMote>, BackendError> {
        Ok(Vec::new())
    }

    #[test]
    fn test_poller_config_default() {
        assert_eq!(PollerConfig::default().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_interval_is_clamped() {
        let registry: Arc<Registry> = Arc::new(Registry::new(empty_backend));
        let poller = Poller::with_config(
            registry.clone(),
            PollerConfig {
                interval: Duration::ZERO,
            },
        );
        assert_eq!(poller.config().interval, PollerConfig::MIN_INTERVAL);

        let poller = Poller::with_config(
            registry,
            PollerConfig {
                interval: Duration::from_millis(250),
            },
        );
        assert_eq!(poller.config().interval, Duration::from_millis(250));
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let registry: Arc<Registry> = Arc::new(Registry::new(empty_backend));
        let poller = Poller::new(registry);
        assert!(matches!(poller.start(), Err(MoteError::RuntimeUnavailable)));
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let registry: Arc<Registry> = Arc::new(Registry::new(empty_backend));
        let poller = Poller::new(registry);

        assert!(poller.start().unwrap());
        assert!(!poller.start().unwrap());
        assert!(poller.is_running());

        assert!(poller.stop());
        assert!(!poller.is_running());
        assert!(!poller.stop());
    }
}
