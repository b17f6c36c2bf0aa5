//! Per-app side actions run when a notification is dismissed.
//!
//! Add new actions in `SideActionRegistry::with_defaults` so the gateway
//! picks them up. Actions are best-effort: they log failures and return,
//! and the deletion proceeds regardless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::run_with_timeout;
use crate::config::SideActionConfig;
use crate::types::NotificationRecord;

pub const MAIL_BUNDLE_ID: &str = "com.apple.mail";

/// Something to do on behalf of an app when one of its notifications goes away.
pub trait DismissAction: Send + Sync {
    /// Bundle id this action is registered under.
    fn bundle_id(&self) -> &'static str;

    /// Runs the action for a record about to be deleted. Must not panic and
    /// must not block past its own timeout.
    fn on_dismiss(&self, record: &NotificationRecord);
}

/// Bundle id → action lookup.
#[derive(Default)]
pub struct SideActionRegistry {
    actions: HashMap<&'static str, Arc<dyn DismissAction>>,
}

impl SideActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in actions, or empty when disabled.
    pub fn with_defaults(config: &SideActionConfig) -> Self {
        let mut registry = Self::new();
        if config.enabled {
            registry.register(Arc::new(MailReadMarker::new(Duration::from_millis(
                config.timeout_ms,
            ))));
        }
        registry
    }

    pub fn register(&mut self, action: Arc<dyn DismissAction>) {
        self.actions.insert(action.bundle_id(), action);
    }

    pub fn get(&self, bundle_id: &str) -> Option<&Arc<dyn DismissAction>> {
        self.actions.get(bundle_id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs the action registered for the record's app, if any.
    pub fn run_for(&self, record: &NotificationRecord) {
        if let Some(action) = self.get(&record.bundle_id) {
            debug!(id = record.id, bundle_id = %record.bundle_id, "Running dismiss side action");
            action.on_dismiss(record);
        }
    }
}

/// Marks the matching unread Mail message as read.
///
/// Mail notifications put the sender in the title and the subject in the
/// subtitle (older builds put it in the body).
#[derive(Debug, Clone)]
pub struct MailReadMarker {
    timeout: Duration,
}

impl MailReadMarker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl DismissAction for MailReadMarker {
    fn bundle_id(&self) -> &'static str {
        MAIL_BUNDLE_ID
    }

    fn on_dismiss(&self, record: &NotificationRecord) {
        let subject = if record.subtitle.trim().is_empty() {
            record.body.as_str()
        } else {
            record.subtitle.as_str()
        };
        let Some(script) = mark_read_script(&record.title, subject) else {
            return;
        };

        match run_with_timeout("osascript", &["-e", &script], self.timeout) {
            Ok(status) if status.success() => {
                debug!(id = record.id, "Marked mail message read");
            }
            Ok(status) => {
                debug!(id = record.id, status = %status, "Mail mark-read script did not succeed");
            }
            Err(err) => {
                warn!(id = record.id, error = %err, "Mail mark-read script failed");
            }
        }
    }
}

/// Escapes a value for use inside an AppleScript double-quoted string.
pub fn escape_applescript(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Builds the mark-read script, or `None` when there is nothing to match on.
fn mark_read_script(sender: &str, subject: &str) -> Option<String> {
    let sender = sender.trim();
    let subject = subject.trim();
    let mut filters = vec!["read status is false".to_string()];
    if !sender.is_empty() {
        filters.push(format!("sender contains \"{}\"", escape_applescript(sender)));
    }
    if !subject.is_empty() {
        filters.push(format!("subject contains \"{}\"", escape_applescript(subject)));
    }
    if filters.len() == 1 {
        return None;
    }

    Some(format!(
        "if application \"Mail\" is running then\n\
         tell application \"Mail\"\n\
         set matches to (messages of inbox whose {})\n\
         repeat with m in matches\n\
         set read status of m to true\n\
         end repeat\n\
         end tell\n\
         end if",
        filters.join(" and ")
    ))
}
