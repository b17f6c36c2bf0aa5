//! Filesystem locations used by the bridge.
//!
//! The home directory comes from the passwd entry of the invoking uid rather
//! than `$HOME`, which is unreliable under `sudo` and launchd service contexts.

use std::env;
use std::ffi::{CStr, OsStr, OsString};
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::error::{BridgeError, Result};

const USERNOTED_GROUP: &str = "Library/Group Containers/group.com.apple.usernoted";
const CACHE_FILE_NAME: &str = ".notif_cache.json";
const CONFIG_ENV: &str = "NOTIF_BRIDGE_CONFIG";

/// Home directory of the current uid, looked up with `getpwuid_r`.
pub fn user_home() -> Result<PathBuf> {
    // SAFETY: getuid has no preconditions and cannot fail.
    #[allow(unsafe_code)]
    let uid = unsafe { libc::getuid() };
    let mut buf = vec![0 as libc::c_char; 2048];
    // SAFETY: passwd is plain old data; an all-zero value is a valid placeholder.
    #[allow(unsafe_code)]
    let mut passwd = unsafe { mem::zeroed::<libc::passwd>() };
    let mut result = ptr::null_mut::<libc::passwd>();

    loop {
        // SAFETY: every pointer refers to storage owned by this frame and
        // `buf.len()` is the true capacity of `buf`.
        #[allow(unsafe_code)]
        let rc = unsafe {
            libc::getpwuid_r(uid, &mut passwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if rc != libc::ERANGE {
            break;
        }
        let grown = buf
            .len()
            .checked_mul(2)
            .ok_or(BridgeError::HomeNotFound { uid })?;
        buf.resize(grown, 0);
    }

    if result.is_null() || passwd.pw_dir.is_null() {
        return Err(BridgeError::HomeNotFound { uid });
    }

    // SAFETY: pw_dir is non-null and points into `buf`, which is still alive.
    #[allow(unsafe_code)]
    let dir = unsafe { CStr::from_ptr(passwd.pw_dir) };
    let home = PathBuf::from(OsStr::from_bytes(dir.to_bytes()));
    if home.is_absolute() {
        Ok(home)
    } else {
        Err(BridgeError::HomeNotFound { uid })
    }
}

/// The usernoted record database.
pub fn store_path(home: &Path) -> PathBuf {
    home.join(USERNOTED_GROUP).join("db2").join("db")
}

/// The write-ahead log that sits next to the record database.
pub fn wal_path(store: &Path) -> PathBuf {
    let mut name = OsString::from(store.as_os_str());
    name.push("-wal");
    PathBuf::from(name)
}

/// The usernoted preferences plist holding per-app flags.
pub fn banner_prefs_path(home: &Path) -> PathBuf {
    home.join(USERNOTED_GROUP)
        .join("Library")
        .join("Preferences")
        .join("group.com.apple.usernoted.plist")
}

/// Hidden cache file next to the running executable.
pub fn default_cache_path() -> Result<PathBuf> {
    let exe = env::current_exe().map_err(|source| BridgeError::Io {
        context: "resolving current executable".to_string(),
        source,
    })?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(CACHE_FILE_NAME))
}

/// Config file location: `$NOTIF_BRIDGE_CONFIG`, else `~/.config/notif-bridge/config.toml`.
pub fn config_path(home: Option<&Path>) -> Option<PathBuf> {
    match env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        Some(path) => Some(PathBuf::from(path)),
        None => home.map(|home| home.join(".config").join("notif-bridge").join("config.toml")),
    }
}
