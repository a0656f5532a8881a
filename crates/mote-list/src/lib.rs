//! Mote List Library
//!
//! This crate keeps a thread-safe, periodically refreshed list of the
//! USB-serial devices ("motes") attached to a host and notifies subscribers
//! when motes come and go.
//!
//! # Architecture
//!
//! - A [`Backend`] reports the devices it can see as [`RawMote`] records
//! - [`reconcile`](reconcile::reconcile) merges each snapshot into the previous
//!   list, keeping existing records (and their user data) for motes that stay
//!   connected and keeping manually added motes
//! - The [`Registry`] owns the list and subscribers behind a single lock
//! - The [`Poller`] runs update cycles on an interval until stopped
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mote_list::{Poller, Registry};
//!
//! # async fn run() -> Result<(), mote_list::MoteError> {
//! let registry: Arc<Registry> = Arc::new(Registry::detect()?);
//! registry.subscribe(|| {
//!     println!("Mote list changed");
//!     Ok(())
//! });
//!
//! let poller = Poller::new(registry.clone());
//! poller.start()?;
//!
//! for mote in registry.get_list(false)? {
//!     println!("Found mote: {}", mote.port());
//! }
//! poller.stop();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod display;
pub mod error;
pub mod mote;
pub mod poller;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod scanner;
pub mod usb_ids;

pub use backend::Backend;
pub use error::{BackendError, MoteError};
pub use mote::{Mote, MoteId, RawMote, NOT_AVAILABLE};
pub use poller::{Poller, PollerConfig};
pub use probe::{PortProbe, ProbeConfig, SerialPortProbe};
pub use reconcile::{reconcile, Reconciliation};
pub use registry::{
    BackendFailurePolicy, CallbackError, CallbackResult, ManualPortCheck, Registry,
    RegistryConfig, SubscriptionId,
};
pub use scanner::{ScannerConfig, SerialBackend};
