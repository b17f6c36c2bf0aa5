//! Access to the usernoted record database.
//!
//! The database belongs to the OS notification service, which writes to it
//! at any time. We only ever hold a connection for the duration of one call:
//! reads go through a read-only connection so they never contend for the
//! writer's lock, and the writer is free to checkpoint or recreate files
//! between our calls.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::types::{app_name_from_bundle, DismissTarget, NotificationRecord, RecordId, Snapshot};

const READ_BUSY_TIMEOUT_MS: u64 = 250;
const WRITE_BUSY_TIMEOUT_MS: u64 = 2_000;

const SELECT_RECORDS: &str = "SELECT r.rec_id, r.data, a.identifier, r.delivered_date \
     FROM record r \
     JOIN app a ON r.app_id = a.app_id";

/// The narrow port the rest of the crate uses to reach the store.
pub trait NotificationStore {
    /// Reads every live record, surfacing open/query failures.
    ///
    /// A store file that doesn't exist yet is an empty snapshot, not an error.
    /// Rows that fail to decode are skipped either way.
    fn try_read_all(&self) -> Result<Snapshot>;

    /// Reads a single record. `None` covers both "never existed" and
    /// "already dismissed elsewhere".
    fn read_one(&self, id: RecordId) -> Option<NotificationRecord>;

    /// Deletes the targeted records in one statement, returning the row count.
    fn delete(&self, target: DismissTarget) -> Result<usize>;

    /// Like `try_read_all`, but degrades any failure to an empty snapshot.
    fn read_all(&self) -> Snapshot {
        match self.try_read_all() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Notification store unreadable; using empty snapshot");
                Snapshot::default()
            }
        }
    }
}

/// SQLite-backed store at a fixed path.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

struct RawRow {
    id: i64,
    data: Option<Vec<u8>>,
    identifier: Option<String>,
    delivered_at: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordPayload {
    #[serde(default)]
    req: Option<PayloadRequest>,
}

#[derive(Debug, Default, Deserialize)]
struct PayloadRequest {
    #[serde(default)]
    titl: String,
    #[serde(default)]
    subt: String,
    #[serde(default)]
    body: String,
}

impl RecordStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_read_only(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|source| {
            BridgeError::StoreOpen {
                path: self.path.clone(),
                source,
            }
        })?;
        conn.busy_timeout(Duration::from_millis(READ_BUSY_TIMEOUT_MS))
            .map_err(|source| BridgeError::StoreQuery {
                context: "setting busy timeout".to_string(),
                source,
            })?;
        Ok(conn)
    }

    fn open_read_write(&self) -> Result<Connection> {
        // No SQLITE_OPEN_CREATE: a missing store must stay missing.
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|source| {
            BridgeError::StoreOpen {
                path: self.path.clone(),
                source,
            }
        })?;
        conn.busy_timeout(Duration::from_millis(WRITE_BUSY_TIMEOUT_MS))
            .map_err(|source| BridgeError::StoreQuery {
                context: "setting busy timeout".to_string(),
                source,
            })?;
        Ok(conn)
    }
}

impl NotificationStore for RecordStore {
    fn try_read_all(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Notification store absent");
            return Ok(Snapshot::default());
        }

        let conn = self.open_read_only()?;
        let sql = format!("{} ORDER BY r.delivered_date DESC", SELECT_RECORDS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|source| BridgeError::StoreQuery {
                context: "preparing record query".to_string(),
                source,
            })?;
        let rows = stmt
            .query_map([], raw_row)
            .map_err(|source| BridgeError::StoreQuery {
                context: "reading record rows".to_string(),
                source,
            })?;

        let mut records = Vec::new();
        for row in rows {
            let raw = match row {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable record row");
                    continue;
                }
            };
            match decode_record(raw) {
                Ok(record) => records.push(record),
                Err(err) => warn!(error = %err, "Skipping undecodable record"),
            }
        }

        Ok(Snapshot::new(records))
    }

    fn read_one(&self, id: RecordId) -> Option<NotificationRecord> {
        if !self.path.exists() {
            return None;
        }

        let lookup = || -> Result<Option<RawRow>> {
            let conn = self.open_read_only()?;
            let sql = format!("{} WHERE r.rec_id = ?1", SELECT_RECORDS);
            conn.query_row(&sql, params![id], raw_row)
                .optional()
                .map_err(|source| BridgeError::StoreQuery {
                    context: format!("reading record {}", id),
                    source,
                })
        };

        match lookup() {
            Ok(Some(raw)) => match decode_record(raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(error = %err, "Record present but undecodable");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(id, error = %err, "Failed to look up record");
                None
            }
        }
    }

    fn delete(&self, target: DismissTarget) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let conn = self.open_read_write()?;
        let deleted = match target {
            DismissTarget::One(id) => conn.execute("DELETE FROM record WHERE rec_id = ?1", params![id]),
            DismissTarget::All => conn.execute("DELETE FROM record", []),
        }
        .map_err(|source| BridgeError::StoreQuery {
            context: format!("deleting {:?}", target),
            source,
        })?;

        Ok(deleted)
    }
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        data: row.get(1)?,
        identifier: row.get(2)?,
        delivered_at: row.get(3)?,
    })
}

fn decode_record(raw: RawRow) -> Result<NotificationRecord> {
    let data = raw.data.ok_or_else(|| BridgeError::PayloadDecode {
        id: raw.id,
        details: "payload missing".to_string(),
    })?;
    let bundle_id = raw.identifier.ok_or_else(|| BridgeError::PayloadDecode {
        id: raw.id,
        details: "app identifier missing".to_string(),
    })?;
    let payload: RecordPayload =
        plist::from_bytes(&data).map_err(|err| BridgeError::PayloadDecode {
            id: raw.id,
            details: err.to_string(),
        })?;
    let request = payload.req.unwrap_or_default();

    Ok(NotificationRecord {
        id: raw.id,
        app: app_name_from_bundle(&bundle_id),
        bundle_id,
        title: request.titl,
        subtitle: request.subt,
        body: request.body,
        delivered_at: raw.delivered_at.unwrap_or_default(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builds stores shaped like usernoted's `record`/`app` tables.

    use super::*;

    pub fn payload(title: &str, subtitle: &str, body: &str) -> Vec<u8> {
        let mut req = plist::Dictionary::new();
        req.insert("titl".to_string(), plist::Value::String(title.to_string()));
        req.insert("subt".to_string(), plist::Value::String(subtitle.to_string()));
        req.insert("body".to_string(), plist::Value::String(body.to_string()));
        let mut root = plist::Dictionary::new();
        root.insert("req".to_string(), plist::Value::Dictionary(req));

        let mut buf = Vec::new();
        plist::Value::Dictionary(root)
            .to_writer_binary(&mut buf)
            .expect("encode payload");
        buf
    }

    pub struct FixtureStore {
        pub path: PathBuf,
        conn: Connection,
    }

    impl FixtureStore {
        pub fn create(path: PathBuf) -> Self {
            let conn = Connection::open(&path).expect("open fixture store");
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 CREATE TABLE app (
                    app_id INTEGER PRIMARY KEY,
                    identifier VARCHAR
                 );
                 CREATE TABLE record (
                    rec_id INTEGER PRIMARY KEY,
                    app_id INTEGER,
                    data BLOB,
                    delivered_date REAL
                 );",
            )
            .expect("create fixture schema");
            Self { path, conn }
        }

        pub fn add_app(&self, app_id: i64, identifier: &str) {
            self.conn
                .execute(
                    "INSERT INTO app (app_id, identifier) VALUES (?1, ?2)",
                    params![app_id, identifier],
                )
                .expect("insert app");
        }

        pub fn add_record(&self, rec_id: i64, app_id: i64, data: &[u8], delivered: f64) {
            self.conn
                .execute(
                    "INSERT INTO record (rec_id, app_id, data, delivered_date) VALUES (?1, ?2, ?3, ?4)",
                    params![rec_id, app_id, data, delivered],
                )
                .expect("insert record");
        }

        pub fn store(&self) -> RecordStore {
            RecordStore::new(self.path.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{payload, FixtureStore};
    use super::*;

    fn seeded(dir: &Path) -> FixtureStore {
        let fixture = FixtureStore::create(dir.join("db"));
        fixture.add_app(1, "org.whispersystems.signal-desktop");
        fixture.add_app(2, "com.example.fooapp");
        fixture.add_record(10, 1, &payload("Alice", "", "hello"), 100.0);
        fixture.add_record(11, 2, &payload("Build", "main", "passed"), 200.0);
        fixture
    }

    #[test]
    fn reads_records_newest_first() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = seeded(temp_dir.path());

        let snapshot = fixture.store().try_read_all().expect("read");
        let ids: Vec<_> = snapshot.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![11, 10]);

        let newest = &snapshot.records()[0];
        assert_eq!(newest.app, "fooapp");
        assert_eq!(newest.title, "Build");
        assert_eq!(newest.subtitle, "main");
        assert_eq!(newest.body, "passed");
        assert_eq!(snapshot.records()[1].app, "Signal");
    }

    #[test]
    fn corrupt_payload_drops_only_that_record() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = seeded(temp_dir.path());
        fixture.add_record(12, 1, b"definitely not a plist", 300.0);

        let snapshot = fixture.store().read_all();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.identity_set().contains(&12));
    }

    #[test]
    fn one_good_one_corrupt_yields_exactly_one() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = FixtureStore::create(temp_dir.path().join("db"));
        fixture.add_app(1, "com.apple.mail");
        fixture.add_record(1, 1, &payload("Bob", "Invoice", ""), 1.0);
        fixture.add_record(2, 1, &[0xde, 0xad, 0xbe, 0xef], 2.0);

        let snapshot = fixture.store().try_read_all().expect("read");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.records()[0].id, 1);
    }

    #[test]
    fn payload_without_request_yields_empty_fields() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = FixtureStore::create(temp_dir.path().join("db"));
        fixture.add_app(1, "com.example.fooapp");
        let mut buf = Vec::new();
        plist::Value::Dictionary(plist::Dictionary::new())
            .to_writer_binary(&mut buf)
            .expect("encode");
        fixture.add_record(5, 1, &buf, 1.0);

        let snapshot = fixture.store().try_read_all().expect("read");
        assert_eq!(snapshot.len(), 1);
        let record = &snapshot.records()[0];
        assert!(record.title.is_empty() && record.subtitle.is_empty() && record.body.is_empty());
    }

    #[test]
    fn missing_store_is_empty_not_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = RecordStore::new(temp_dir.path().join("nope").join("db"));
        assert!(store.try_read_all().expect("read").is_empty());
        assert!(store.read_one(1).is_none());
        assert_eq!(store.delete(DismissTarget::All).expect("delete"), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn unreadable_store_errors_but_read_all_degrades() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("db");
        fs_err::write(&path, b"this is not a sqlite database, just bytes").expect("write");
        let store = RecordStore::new(path);

        assert!(store.try_read_all().is_err());
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn read_one_finds_present_and_misses_absent() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = seeded(temp_dir.path());
        let store = fixture.store();

        let record = store.read_one(10).expect("record 10");
        assert_eq!(record.title, "Alice");
        assert!(store.read_one(999).is_none());
    }

    #[test]
    fn delete_one_leaves_others_and_missing_id_is_noop() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = seeded(temp_dir.path());
        let store = fixture.store();

        assert_eq!(store.delete(DismissTarget::One(999)).expect("delete"), 0);
        assert_eq!(store.read_all().len(), 2);

        assert_eq!(store.delete(DismissTarget::One(10)).expect("delete"), 1);
        let ids: Vec<_> = store.read_all().records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![11]);
    }

    #[test]
    fn delete_all_then_read_is_empty() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let fixture = seeded(temp_dir.path());
        let store = fixture.store();

        assert_eq!(store.delete(DismissTarget::All).expect("delete"), 2);
        assert!(store.read_all().is_empty());
    }
}
