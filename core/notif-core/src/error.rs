//! Error types for notif-core operations.
//!
//! Most of these never reach a user: the reader, notifier and side actions
//! log and swallow them at their boundaries. They exist so the boundaries
//! have something structured to log.

use std::path::PathBuf;
use std::time::Duration;

/// All errors that can occur in notif-core operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    // ─────────────────────────────────────────────────────────────────────
    // Environment
    // ─────────────────────────────────────────────────────────────────────
    #[error("Could not resolve home directory for uid {uid}")]
    HomeNotFound { uid: u32 },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Record store
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to open notification store {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Notification store query failed: {context}: {source}")]
    StoreQuery {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to decode payload for record {id}: {details}")]
    PayloadDecode { id: i64, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O and serialization
    // ─────────────────────────────────────────────────────────────────────
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Property list error: {path}: {source}")]
    Plist {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("Watch registration failed for {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // External commands
    // ─────────────────────────────────────────────────────────────────────
    #[error("Command execution failed: {command}: {details}")]
    CommandFailed { command: String, details: String },

    #[error("Command timed out after {timeout:?}: {command}")]
    CommandTimedOut { command: String, timeout: Duration },
}

/// Convenience type alias for Results using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
