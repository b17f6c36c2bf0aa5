//! Runtime configuration.
//!
//! Everything is optional: a missing file yields defaults that match the
//! stock SketchyBar setup. Values are read once at startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BridgeError, Result};

const DEFAULT_MIN_INTERVAL_MS: u64 = 2_000;
const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;
const DEFAULT_STEP_MS: u64 = 2_000;
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_CONSUMER_COMMAND: &str = "sketchybar";
const DEFAULT_CONSUMER_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_SIDE_ACTION_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub store_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub watch: WatchConfig,
    pub consumer: ConsumerConfig,
    pub side_actions: SideActionConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeStrategy {
    /// Filesystem events on the store's write-ahead log.
    #[default]
    Edge,
    /// Fixed sleeps of the current cadence interval.
    Poll,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub strategy: WakeStrategy,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub step_ms: u64,
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            strategy: WakeStrategy::default(),
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            step_ms: DEFAULT_STEP_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl WatchConfig {
    /// Cadence bounds, normalized so that `1ms <= min <= max` and `step >= 1ms`.
    pub fn bounds(&self) -> (Duration, Duration, Duration) {
        let min = self.min_interval_ms.max(1);
        let max = self.max_interval_ms.max(min);
        let step = self.step_ms.max(1);
        (
            Duration::from_millis(min),
            Duration::from_millis(max),
            Duration::from_millis(step),
        )
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub command: String,
    pub timeout_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_CONSUMER_COMMAND.to_string(),
            timeout_ms: DEFAULT_CONSUMER_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SideActionConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for SideActionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_SIDE_ACTION_TIMEOUT_MS,
        }
    }
}

/// Loads the config at `path`, returning defaults if it doesn't exist.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    if !path.exists() {
        return Ok(BridgeConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| BridgeError::Io {
        context: "reading config".to_string(),
        source,
    })?;
    toml::from_str::<BridgeConfig>(&content).map_err(|err| BridgeError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(&temp_dir.path().join("absent.toml")).expect("load config");
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.watch.strategy, WakeStrategy::Edge);
        assert_eq!(config.consumer.command, "sketchybar");
        assert!(config.side_actions.enabled);
    }

    #[test]
    fn parses_paths_and_sections() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
store_path = "/tmp/db"
cache_path = "/tmp/.notif_cache.json"

[watch]
strategy = "poll"
min_interval_ms = 1000
max_interval_ms = 10000

[consumer]
command = "true"

[side_actions]
enabled = false
"#,
        )
        .expect("write config");

        let config = load_config(&path).expect("load config");
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/db")));
        assert_eq!(config.watch.strategy, WakeStrategy::Poll);
        assert_eq!(config.watch.min_interval_ms, 1000);
        assert_eq!(config.watch.step_ms, DEFAULT_STEP_MS);
        assert_eq!(config.consumer.command, "true");
        assert_eq!(config.consumer.timeout_ms, DEFAULT_CONSUMER_TIMEOUT_MS);
        assert!(!config.side_actions.enabled);
    }

    #[test]
    fn malformed_file_is_reported() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[watch\nstrategy = ").expect("write config");
        assert!(matches!(
            load_config(&path),
            Err(BridgeError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn bounds_are_normalized() {
        let watch = WatchConfig {
            min_interval_ms: 0,
            max_interval_ms: 0,
            step_ms: 0,
            ..WatchConfig::default()
        };
        let (min, max, step) = watch.bounds();
        assert_eq!(min, Duration::from_millis(1));
        assert_eq!(max, min);
        assert_eq!(step, Duration::from_millis(1));
    }
}
