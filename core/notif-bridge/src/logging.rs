//! Tracing setup.
//!
//! Logs go to stderr because stdout carries the snapshot JSON. A daily
//! rolling file is added when a log directory is configured, which is how
//! the long-running `watch` mode is usually observed.

use std::env;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_ENV: &str = "NOTIF_BRIDGE_DEBUG_LOG";
const LOG_DIR_ENV: &str = "NOTIF_BRIDGE_LOG_DIR";
const LOG_FILE_PREFIX: &str = "notif-bridge.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file output is flushed.
pub fn init(configured_dir: Option<&Path>) -> Option<WorkerGuard> {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let log_dir = env::var_os(LOG_DIR_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| configured_dir.map(Path::to_path_buf));

    let (file_layer, guard) = match log_dir {
        Some(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    guard
}
