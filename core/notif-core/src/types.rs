//! Shared data types: records, snapshots and their identity sets.

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the reference
/// date usernoted stores `delivered_date` against.
const CORE_DATA_EPOCH_OFFSET: f64 = 978_307_200.0;

/// Display names for apps whose bundle id tail reads poorly.
/// Keys must match the consumer's icon map.
static BUNDLE_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("org.whispersystems.signal-desktop", "Signal"),
        ("us.zoom.xos", "zoom.us"),
        ("com.apple.MobileSMS", "Messages"),
        ("com.apple.mail", "Mail"),
        ("com.tinyspeck.slackmacgap", "Slack"),
        ("com.microsoft.teams2", "Microsoft Teams"),
        ("com.microsoft.Outlook", "Microsoft Outlook"),
    ])
});

/// Resolves a human-readable app name for a bundle id.
///
/// Unknown ids fall back to their last dot-separated segment.
pub fn app_name_from_bundle(bundle_id: &str) -> String {
    if let Some(name) = BUNDLE_NAMES.get(bundle_id) {
        return (*name).to_string();
    }
    bundle_id
        .rsplit_once('.')
        .map(|(_, tail)| tail)
        .unwrap_or(bundle_id)
        .to_string()
}

/// One live entry in the notification store, as the consumer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub app: String,
    pub bundle_id: String,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    #[serde(skip)]
    pub delivered_at: f64,
}

impl NotificationRecord {
    /// Delivery time as a UTC timestamp, if the stored value is representable.
    pub fn delivered_at_utc(&self) -> Option<DateTime<Utc>> {
        let unix = self.delivered_at + CORE_DATA_EPOCH_OFFSET;
        if !unix.is_finite() {
            return None;
        }
        let secs = unix.floor();
        let nanos = ((unix - secs) * 1e9) as u32;
        Utc.timestamp_opt(secs as i64, nanos).single()
    }
}

pub type RecordId = i64;

/// Set of record ids in a snapshot; the only thing compared across cycles.
pub type IdentitySet = BTreeSet<RecordId>;

/// Every live record at one observation instant, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<NotificationRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<NotificationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn identity_set(&self) -> IdentitySet {
        self.records.iter().map(|record| record.id).collect()
    }

    pub fn newest(&self) -> Option<&NotificationRecord> {
        self.records.first()
    }
}

/// What a dismissal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissTarget {
    One(RecordId),
    All,
}

impl std::str::FromStr for DismissTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(DismissTarget::All);
        }
        value
            .parse::<RecordId>()
            .map(DismissTarget::One)
            .map_err(|_| format!("expected a record id or \"all\", got {:?}", value))
    }
}
