//! Wake-up strategies for the watch loop.
//!
//! Both strategies take the cadence interval as an upper bound on how long
//! they block, so the loop keeps cycling even if the filesystem never
//! reports anything.

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{WakeStrategy, WatchConfig};
use crate::error::{BridgeError, Result};

const MISSING_WAL_RETRY: Duration = Duration::from_secs(1);

/// Why the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The watched file changed (after debounce).
    FileChanged,
    /// The interval elapsed with nothing observed.
    Elapsed,
}

pub trait WakeSource {
    /// Blocks until the next cycle should run, for at most about `interval`.
    fn wait_for_next_cycle(&mut self, interval: Duration) -> Trigger;
}

/// Sleeps for the whole interval.
#[derive(Debug, Default)]
pub struct PollingWake;

impl WakeSource for PollingWake {
    fn wait_for_next_cycle(&mut self, interval: Duration) -> Trigger {
        thread::sleep(interval);
        Trigger::Elapsed
    }
}

/// Wakes on writes to the store's write-ahead log.
///
/// The WAL is checkpointed, truncated and sometimes deleted by its owner.
/// Removal or rename drops the registration; the next wait re-registers
/// once the file exists again.
pub struct WalWake {
    wal: PathBuf,
    debounce: Duration,
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    registered: bool,
}

enum EventClass {
    Change,
    Rotated,
    Ignored,
}

impl WalWake {
    pub fn new(wal: PathBuf, debounce: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(|source| BridgeError::Watch {
            path: wal.clone(),
            source,
        })?;

        Ok(Self {
            wal,
            debounce,
            watcher,
            rx,
            registered: false,
        })
    }

    pub fn wal(&self) -> &Path {
        &self.wal
    }

    fn ensure_registered(&mut self) -> bool {
        if self.registered {
            return true;
        }
        if !self.wal.exists() {
            return false;
        }
        match self.watcher.watch(&self.wal, RecursiveMode::NonRecursive) {
            Ok(()) => {
                debug!(path = %self.wal.display(), "Watching write-ahead log");
                self.registered = true;
            }
            Err(err) => {
                warn!(path = %self.wal.display(), error = %err, "Failed to watch write-ahead log");
            }
        }
        self.registered
    }

    fn drop_registration(&mut self) {
        if self.registered {
            let _ = self.watcher.unwatch(&self.wal);
            self.registered = false;
        }
    }

    /// Lets a burst of writes settle, then discards what queued up meanwhile.
    fn settle(&mut self) {
        thread::sleep(self.debounce);
        while let Ok(res) = self.rx.try_recv() {
            match res {
                Ok(event) => {
                    if matches!(classify(&event), EventClass::Rotated) {
                        self.drop_registration();
                    }
                }
                Err(_) => self.drop_registration(),
            }
        }
    }
}

impl WakeSource for WalWake {
    fn wait_for_next_cycle(&mut self, interval: Duration) -> Trigger {
        let deadline = Instant::now() + interval;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Trigger::Elapsed;
            }

            if !self.ensure_registered() {
                thread::sleep(remaining.min(MISSING_WAL_RETRY));
                continue;
            }

            match self.rx.recv_timeout(remaining) {
                Ok(Ok(event)) => match classify(&event) {
                    EventClass::Change => {
                        self.settle();
                        return Trigger::FileChanged;
                    }
                    EventClass::Rotated => {
                        debug!(path = %self.wal.display(), "Write-ahead log rotated");
                        self.drop_registration();
                        self.settle();
                        return Trigger::FileChanged;
                    }
                    EventClass::Ignored => continue,
                },
                Ok(Err(err)) => {
                    warn!(error = %err, "Write-ahead log watch error; re-registering");
                    self.drop_registration();
                }
                Err(RecvTimeoutError::Timeout) => return Trigger::Elapsed,
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(remaining);
                    return Trigger::Elapsed;
                }
            }
        }
    }
}

fn classify(event: &Event) -> EventClass {
    match event.kind {
        EventKind::Access(_) => EventClass::Ignored,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => EventClass::Rotated,
        _ => EventClass::Change,
    }
}

/// Builds the configured wake source, falling back to polling when the
/// platform can't provide file events.
pub fn wake_source_for(config: &WatchConfig, wal: PathBuf) -> Box<dyn WakeSource> {
    match config.strategy {
        WakeStrategy::Poll => {
            info!("Using polling wake strategy");
            Box::new(PollingWake)
        }
        WakeStrategy::Edge => match WalWake::new(wal, config.debounce()) {
            Ok(wake) => {
                info!(path = %wake.wal().display(), "Using write-ahead log wake strategy");
                Box::new(wake)
            }
            Err(err) => {
                warn!(error = %err, "File events unavailable; falling back to polling");
                Box::new(PollingWake)
            }
        },
    }
}
