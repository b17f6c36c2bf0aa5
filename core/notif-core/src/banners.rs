//! Native banner suppression.
//!
//! usernoted keeps a `flags` bitmask per app under the `apps` dictionary of
//! its preferences plist; bit 29 enables banner display. Clearing it and
//! restarting usernoted turns banners off while leaving notifications in
//! Notification Center, where the bridge picks them up.

use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::atomic_write;
use crate::command::run_with_timeout;
use crate::error::{BridgeError, Result};

pub const BANNER_BIT: i64 = 1 << 29;

const SERVICE_NAME: &str = "usernoted";
const RESTART_TIMEOUT: Duration = Duration::from_secs(5);
const BINARY_PLIST_MAGIC: &[u8] = b"bplist";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerOutcome {
    /// Bundle ids whose banner bit was cleared.
    pub cleared: Vec<String>,
}

impl BannerOutcome {
    pub fn rewritten(&self) -> bool {
        !self.cleared.is_empty()
    }
}

/// Clears the banner bit on every app entry that has it set.
///
/// Entries without the bit, or without an integer `flags`, are left exactly
/// as they were.
pub fn clear_banner_bits(prefs: &mut plist::Dictionary) -> Vec<String> {
    let Some(apps) = prefs.get_mut("apps").and_then(plist::Value::as_dictionary_mut) else {
        return vec![];
    };

    let mut cleared = Vec::new();
    for (bundle_id, entry) in apps.iter_mut() {
        let Some(flags) = entry
            .as_dictionary_mut()
            .and_then(|app| app.get_mut("flags"))
        else {
            continue;
        };
        let Some(value) = flags.as_signed_integer() else {
            continue;
        };
        if value & BANNER_BIT != 0 {
            *flags = plist::Value::Integer((value & !BANNER_BIT).into());
            cleared.push(bundle_id.clone());
        }
    }
    cleared
}

/// Rewrites the preferences file with banners disabled for every app.
///
/// The file is only written when at least one entry changed, in the format
/// it was read in. A missing file is an error the caller must report.
pub fn suppress_banners(path: &Path) -> Result<BannerOutcome> {
    if !path.exists() {
        return Err(BridgeError::FileNotFound(path.to_path_buf()));
    }

    let bytes = fs_err::read(path).map_err(|source| BridgeError::Io {
        context: "reading notification preferences".to_string(),
        source,
    })?;
    let mut root: plist::Value = plist::from_bytes(&bytes).map_err(|source| BridgeError::Plist {
        path: path.to_path_buf(),
        source,
    })?;

    let cleared = match root.as_dictionary_mut() {
        Some(prefs) => clear_banner_bits(prefs),
        None => vec![],
    };
    if cleared.is_empty() {
        return Ok(BannerOutcome::default());
    }

    let mut out = Vec::with_capacity(bytes.len());
    let written = if bytes.starts_with(BINARY_PLIST_MAGIC) {
        root.to_writer_binary(&mut out)
    } else {
        root.to_writer_xml(&mut out)
    };
    written.map_err(|source| BridgeError::Plist {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &out)?;

    info!(count = cleared.len(), "Cleared banner flag");
    Ok(BannerOutcome { cleared })
}

/// Restarts usernoted so it reloads its preferences.
pub fn restart_notification_service() {
    match run_with_timeout("killall", &[SERVICE_NAME], RESTART_TIMEOUT) {
        Ok(status) if status.success() => info!(service = SERVICE_NAME, "Restarted"),
        Ok(status) => warn!(service = SERVICE_NAME, status = %status, "Restart exited non-zero"),
        Err(err) => warn!(service = SERVICE_NAME, error = %err, "Restart failed"),
    }
}
