//! Tells the status bar that the cache changed.
//!
//! The consumer subscribes to a named event; it re-reads the cache when the
//! event fires. A missed signal only delays the update until the next change,
//! so failures here are logged and dropped.

use std::time::Duration;
use tracing::{debug, warn};

use crate::command::run_with_timeout;
use crate::config::ConsumerConfig;

/// Event name the consumer listens for. Changing it requires changing the
/// consumer's subscription too.
pub const CHANGE_EVENT: &str = "wal_changed";

pub trait ConsumerNotifier {
    /// Signals the consumer. Never fails and never blocks past a short bound.
    fn notify(&self);
}

/// Broadcasts `CHANGE_EVENT` through the status bar's CLI.
#[derive(Debug, Clone)]
pub struct TriggerNotifier {
    command: String,
    timeout: Duration,
}

impl TriggerNotifier {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ConsumerConfig) -> Self {
        Self::new(
            config.command.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }
}

impl ConsumerNotifier for TriggerNotifier {
    fn notify(&self) {
        match run_with_timeout(&self.command, &["--trigger", CHANGE_EVENT], self.timeout) {
            Ok(status) if status.success() => {
                debug!(command = %self.command, event = CHANGE_EVENT, "Consumer notified");
            }
            Ok(status) => {
                warn!(command = %self.command, status = %status, "Consumer trigger exited non-zero");
            }
            Err(err) => {
                warn!(error = %err, "Consumer trigger failed");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::ConsumerNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts notifications instead of signalling anything.
    #[derive(Debug, Default)]
    pub struct CountingNotifier {
        count: AtomicUsize,
    }

    impl CountingNotifier {
        pub fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    impl ConsumerNotifier for CountingNotifier {
        fn notify(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
