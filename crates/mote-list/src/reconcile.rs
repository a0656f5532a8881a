//! Mote list reconciliation
//!
//! Merges a fresh backend snapshot into the previous authoritative list.
//! Motes that stay connected keep their previous record, so attached user
//! data and the manual flag survive across polls. Manual motes survive even
//! when a scan does not report them.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::mote::{Mote, MoteId, RawMote};

/// Result of merging one snapshot
#[derive(Debug)]
pub struct Reconciliation<U> {
    /// New authoritative list, sorted by identity
    pub motes: Vec<Mote<U>>,
    /// Whether the list differs from the previous one
    pub changed: bool,
    /// Motes that were not in the previous list
    pub added: Vec<MoteId>,
    /// Motes that were dropped from the previous list
    pub removed: Vec<MoteId>,
}

/// Merge `snapshot` into `previous`.
///
/// Phantom records (reference `n/a`) are dropped, duplicates within the
/// snapshot collapse to their first occurrence, and the result is sorted by
/// normalized host then port.
pub fn reconcile<U, I>(previous: Vec<Mote<U>>, snapshot: I) -> Reconciliation<U>
where
    I: IntoIterator<Item = RawMote>,
{
    let previous_len = previous.len();
    let mut previous: HashMap<MoteId, Mote<U>> =
        previous.into_iter().map(|m| (m.id(), m)).collect();

    let mut seen = HashSet::new();
    let mut motes = Vec::with_capacity(previous_len);
    let mut added = Vec::new();

    for raw in snapshot {
        if raw.is_phantom() {
            trace!("Skipping phantom port {}", raw.port);
            continue;
        }

        let candidate = Mote::discovered(raw);
        let id = candidate.id();
        if !seen.insert(id.clone()) {
            continue;
        }

        match previous.remove(&id) {
            Some(existing) => motes.push(existing),
            None => {
                added.push(id);
                motes.push(candidate);
            }
        }
    }

    let mut removed = Vec::new();
    for (id, mote) in previous {
        if mote.is_manual() {
            motes.push(mote);
        } else {
            removed.push(id);
        }
    }

    let changed = !added.is_empty() || motes.len() != previous_len;

    motes.sort_by(|a, b| a.cmp_identity(b));
    added.sort();
    removed.sort();

    Reconciliation {
        motes,
        changed,
        added,
        removed,
    }
}
