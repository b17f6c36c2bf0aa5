//! The read → diff → publish → notify loop.
//!
//! All state that carries across cycles lives in `WatchState`, which the
//! caller owns and threads through `run_cycle`. Nothing in here terminates
//! the loop: read failures push the cadence to its maximum and the next
//! cycle tries again.

mod cadence;
mod wake;

pub use cadence::{Cadence, CadencePhase};
pub use wake::{wake_source_for, PollingWake, Trigger, WakeSource, WalWake};

use tracing::{debug, info, warn};

use crate::cache::CachePublisher;
use crate::config::WatchConfig;
use crate::diff::diff_snapshot;
use crate::notifier::ConsumerNotifier;
use crate::store::NotificationStore;
use crate::types::IdentitySet;

/// Loop-local state: the ids seen last cycle and the current cadence.
#[derive(Debug, Clone)]
pub struct WatchState {
    known: Option<IdentitySet>,
    cadence: Cadence,
}

impl WatchState {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            known: None,
            cadence,
        }
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    pub fn known(&self) -> Option<&IdentitySet> {
        self.known.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Changed { records: usize },
    Unchanged,
    ReadFailed,
}

/// Runs one read-detect-notify cycle and updates `state` accordingly.
pub fn run_cycle<S: NotificationStore>(
    state: &mut WatchState,
    store: &S,
    publisher: &CachePublisher,
    notifier: &dyn ConsumerNotifier,
) -> CycleOutcome {
    let snapshot = match store.try_read_all() {
        Ok(snapshot) => snapshot,
        Err(err) => {
            state.cadence.on_read_failure();
            warn!(
                error = %err,
                next_ms = state.cadence.interval().as_millis() as u64,
                "Notification store read failed; backing off"
            );
            return CycleOutcome::ReadFailed;
        }
    };

    let diff = diff_snapshot(state.known.as_ref(), &snapshot);
    if !diff.changed {
        state.cadence.on_idle();
        debug!(
            next_ms = state.cadence.interval().as_millis() as u64,
            "No change"
        );
        return CycleOutcome::Unchanged;
    }

    // The known set only advances once the cache holds it, so a failed
    // publish is retried on the next cycle.
    match publisher.publish(&snapshot) {
        Ok(()) => state.known = Some(diff.current),
        Err(err) => {
            warn!(
                path = %publisher.path().display(),
                error = %err,
                "Failed to publish cache; will retry"
            );
        }
    }
    notifier.notify();

    state.cadence.on_changed();
    info!(
        records = snapshot.len(),
        newest = ?snapshot.newest().and_then(|record| record.delivered_at_utc()),
        "Notification set changed"
    );
    CycleOutcome::Changed {
        records: snapshot.len(),
    }
}

/// Runs cycles forever, waiting on `wake` between them.
pub fn watch<S: NotificationStore>(
    store: &S,
    publisher: &CachePublisher,
    notifier: &dyn ConsumerNotifier,
    wake: &mut dyn WakeSource,
    config: &WatchConfig,
) -> ! {
    let mut state = WatchState::new(Cadence::from_config(config));
    info!(
        cache = %publisher.path().display(),
        min_ms = config.min_interval_ms,
        max_ms = config.max_interval_ms,
        "Watching notification store"
    );

    loop {
        run_cycle(&mut state, store, publisher, notifier);
        let trigger = wake.wait_for_next_cycle(state.cadence.interval());
        debug!(trigger = ?trigger, phase = ?state.cadence.phase(), "Woke");
    }
}
