//! Change detection between watch cycles.
//!
//! Only record ids are compared. A record whose fields change in place while
//! keeping its id is not reported as a change; usernoted replaces records
//! rather than editing them in practice, and the consumer re-reads the whole
//! cache whenever any id comes or goes.

use crate::types::{IdentitySet, Snapshot};

/// Result of comparing a snapshot against what the previous cycle saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub changed: bool,
    pub current: IdentitySet,
}

/// Compares `current` against the previously observed ids.
///
/// `previous` is `None` before the first observation, which always counts
/// as a change so the cache gets an initial publish even when empty.
pub fn diff_snapshot(previous: Option<&IdentitySet>, current: &Snapshot) -> SnapshotDiff {
    let ids = current.identity_set();
    let changed = match previous {
        Some(previous) => *previous != ids,
        None => true,
    };
    SnapshotDiff {
        changed,
        current: ids,
    }
}
