//! The consumer-facing cache file.
//!
//! The status bar reads this file whenever it is told to, possibly while we
//! are in the middle of replacing it. Each publish goes to a temp file in the
//! same directory and is renamed into place, so a reader only ever sees a
//! complete old or complete new snapshot.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{BridgeError, Result};
use crate::types::Snapshot;

#[derive(Debug, Clone)]
pub struct CachePublisher {
    path: PathBuf,
}

impl CachePublisher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the snapshot as a JSON array and atomically replaces the cache.
    pub fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        let payload = render(snapshot)?;
        atomic_write(&self.path, payload.as_bytes())
    }
}

/// JSON form shared by the cache file and the one-shot stdout output.
pub fn render(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string(snapshot.records()).map_err(|source| BridgeError::Json {
        context: "serializing snapshot".to_string(),
        source,
    })
}

/// Writes `contents` to a temp file beside `path` and renames it into place.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BridgeError::Io {
        context: format!("creating temp file in {}", dir.display()),
        source: e,
    })?;

    tmp.write_all(contents).map_err(|e| BridgeError::Io {
        context: format!("writing temp file for {}", path.display()),
        source: e,
    })?;

    tmp.flush().map_err(|e| BridgeError::Io {
        context: format!("flushing temp file for {}", path.display()),
        source: e,
    })?;

    tmp.persist(path).map_err(|e| BridgeError::Io {
        context: format!("persisting temp file to {}", path.display()),
        source: e.error,
    })?;

    Ok(())
}
