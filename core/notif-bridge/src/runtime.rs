//! Resolves configuration into the concrete store, publisher and notifier.

use std::path::PathBuf;

use notif_core::actions::SideActionRegistry;
use notif_core::cache::{render, CachePublisher};
use notif_core::config::{load_config, BridgeConfig};
use notif_core::notifier::TriggerNotifier;
use notif_core::paths;
use notif_core::store::RecordStore;
use notif_core::types::Snapshot;
use notif_core::Result;
use tracing::warn;

pub struct Runtime {
    pub config: BridgeConfig,
    pub store: RecordStore,
    pub publisher: CachePublisher,
    pub notifier: TriggerNotifier,
    pub actions: SideActionRegistry,
}

/// Loads the config file, falling back to defaults when it is unreadable.
///
/// Runs before logging is installed, so problems are returned as text for
/// the caller to log once the subscriber exists.
pub fn load() -> (BridgeConfig, Option<String>) {
    let home = paths::user_home().ok();
    let Some(path) = paths::config_path(home.as_deref()) else {
        return (BridgeConfig::default(), None);
    };
    match load_config(&path) {
        Ok(config) => (config, None),
        Err(err) => (
            BridgeConfig::default(),
            Some(format!("{err}; using defaults")),
        ),
    }
}

impl Runtime {
    pub fn build(config: BridgeConfig) -> Result<Self> {
        let store_path = match &config.store_path {
            Some(path) => path.clone(),
            None => paths::store_path(&paths::user_home()?),
        };
        let cache_path = cache_path(&config)?;

        Ok(Self {
            store: RecordStore::new(store_path),
            publisher: CachePublisher::new(cache_path),
            notifier: TriggerNotifier::from_config(&config.consumer),
            actions: SideActionRegistry::with_defaults(&config.side_actions),
            config,
        })
    }

    pub fn wal_path(&self) -> PathBuf {
        paths::wal_path(self.store.path())
    }
}

fn cache_path(config: &BridgeConfig) -> Result<PathBuf> {
    match &config.cache_path {
        Some(path) => Ok(path.clone()),
        None => paths::default_cache_path(),
    }
}

/// Publishes `snapshot` and returns the JSON printed by the list command.
///
/// A failed publish is logged; the caller still gets the rendered snapshot.
pub fn publish_listing(snapshot: &Snapshot, publisher: &CachePublisher) -> Result<String> {
    if let Err(err) = publisher.publish(snapshot) {
        warn!(path = %publisher.path().display(), error = %err, "Failed to publish cache");
    }
    render(snapshot)
}

/// Listing used when the runtime could not be built: an empty snapshot,
/// published to the cache when its location is still resolvable.
pub fn degraded_listing(config: &BridgeConfig) -> Result<String> {
    let snapshot = Snapshot::default();
    match cache_path(config) {
        Ok(path) => publish_listing(&snapshot, &CachePublisher::new(path)),
        Err(err) => {
            warn!(error = %err, "Cache location unresolvable; printing only");
            render(&snapshot)
        }
    }
}

pub fn report_config_problem(problem: Option<String>) {
    if let Some(problem) = problem {
        warn!("{problem}");
    }
}
