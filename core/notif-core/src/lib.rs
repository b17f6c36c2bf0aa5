//! # notif-core
//!
//! Mirrors the macOS notification center database into a JSON cache for a
//! status bar, and dismisses notifications on request.
//!
//! ## Design Principles
//!
//! - **Foreign store**: the database belongs to usernoted. We read it
//!   read-only, reopen it on every call, and only ever delete from it.
//! - **Graceful degradation**: missing files, locked databases and bad rows
//!   degrade to fewer (or zero) records, never to a crash.
//! - **Atomic publication**: the cache is replaced by rename, so the consumer
//!   never reads a partial file.
//! - **Synchronous**: no async runtime. The watch loop is a plain blocking loop.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use notif_core::{CachePublisher, NotificationStore, RecordStore};
//!
//! let store = RecordStore::new(notif_core::paths::store_path(&home));
//! let snapshot = store.read_all();
//! CachePublisher::new(cache_path).publish(&snapshot)?;
//! ```

pub mod actions;
pub mod banners;
pub mod cache;
pub mod command;
pub mod config;
pub mod diff;
pub mod error;
pub mod gateway;
pub mod notifier;
pub mod paths;
pub mod store;
pub mod types;
pub mod watcher;

pub use actions::{DismissAction, MailReadMarker, SideActionRegistry};
pub use cache::CachePublisher;
pub use config::{load_config, BridgeConfig, WakeStrategy, WatchConfig};
pub use diff::{diff_snapshot, SnapshotDiff};
pub use error::{BridgeError, Result};
pub use gateway::{refresh, MutationGateway};
pub use notifier::{ConsumerNotifier, TriggerNotifier, CHANGE_EVENT};
pub use store::{NotificationStore, RecordStore};
pub use types::*;
pub use watcher::{run_cycle, watch, Cadence, CycleOutcome, WakeSource, WatchState};
