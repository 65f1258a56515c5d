//! Local record store: per-collection CRUD over the `records` table

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Fields, NewRecord, SnapshotKey, StableId, SyncRecord};
use crate::util::unix_millis_now;

/// Storage operations the sync engine (and domain code) relies on.
///
/// Every call is an await point; implementations may block on I/O.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Insert one record; the store assigns its local key
    async fn insert(&self, collection: &str, record: NewRecord) -> Result<SyncRecord>;

    /// Insert many records, skipping any whose stable id already exists in the
    /// collection. Returns the number actually inserted.
    async fn bulk_insert(&self, collection: &str, records: Vec<NewRecord>) -> Result<usize>;

    /// Fetch one record by local key
    async fn get(&self, collection: &str, local_key: i64) -> Result<Option<SyncRecord>>;

    /// All records in the collection, oldest first
    async fn scan_all(&self, collection: &str) -> Result<Vec<SyncRecord>>;

    /// Records whose current revision has not been confirmed remotely
    async fn scan_unsynced(&self, collection: &str) -> Result<Vec<SyncRecord>>;

    /// Records whose domain `field` equals `value`
    async fn scan_where(&self, collection: &str, field: &str, value: &Value)
        -> Result<Vec<SyncRecord>>;

    /// Records whose domain `field` is one of `values`
    async fn scan_in(&self, collection: &str, field: &str, values: &[Value])
        -> Result<Vec<SyncRecord>>;

    /// Stable ids currently present in the collection
    async fn stable_ids(&self, collection: &str) -> Result<HashSet<StableId>>;

    /// Merge `patch` into a record's domain fields (`null` removes a field).
    /// The record becomes pending again.
    async fn update_by_key(&self, collection: &str, local_key: i64, patch: Fields)
        -> Result<SyncRecord>;

    /// Mark exactly the given snapshots synced. A record whose revision has
    /// moved on since the snapshot was read is left pending. Returns the
    /// number of records marked.
    async fn mark_synced(&self, collection: &str, snapshots: &[SnapshotKey]) -> Result<usize>;
}

const RECORD_COLUMNS: &str = "local_key, stable_id, synced, revision, data";

/// `SQLite`-backed [`LocalStore`], shareable across tasks.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open a store at the given filesystem path.
    pub fn open_path(db_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(db_path)?))
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Number of pending records per collection, for status displays.
    pub async fn pending_counts(&self) -> Result<Vec<(String, usize)>> {
        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(
            "SELECT collection, COUNT(*) FROM records
             WHERE synced = 0
             GROUP BY collection
             ORDER BY collection",
        )?;
        let counts = stmt
            .query_map([], |row| {
                let count = row.get::<_, i64>(1)?;
                Ok((row.get::<_, String>(0)?, usize::try_from(count).unwrap_or(0)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }

    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(SyncRecord, String)> {
        let record = SyncRecord {
            local_key: row.get(0)?,
            stable_id: StableId::from(row.get::<_, String>(1)?),
            synced: row.get::<_, i64>(2)? != 0,
            revision: row.get(3)?,
            fields: Fields::new(),
        };
        Ok((record, row.get(4)?))
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        values: Vec<SqlValue>,
    ) -> Result<Vec<SyncRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mut record, data)| {
                record.fields = decode_data(&data)?;
                Ok(record)
            })
            .collect()
    }

    fn get_with(conn: &Connection, collection: &str, local_key: i64) -> Result<Option<SyncRecord>> {
        let found = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM records WHERE collection = ?1 AND local_key = ?2"
                ),
                params![collection, local_key],
                Self::parse_record,
            )
            .optional()?;

        found
            .map(|(mut record, data)| {
                record.fields = decode_data(&data)?;
                Ok(record)
            })
            .transpose()
    }

    fn insert_with(conn: &Connection, collection: &str, record: &NewRecord) -> Result<SyncRecord> {
        if record.stable_id.is_empty() {
            return Err(Error::InvalidInput("stable id must not be empty".into()));
        }
        let now = unix_millis_now();
        conn.execute(
            "INSERT INTO records (collection, stable_id, synced, revision, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
            params![
                collection,
                record.stable_id.as_str(),
                i64::from(record.synced),
                serde_json::to_string(&record.fields)?,
                now
            ],
        )?;

        Ok(SyncRecord {
            local_key: conn.last_insert_rowid(),
            stable_id: record.stable_id.clone(),
            synced: record.synced,
            revision: 1,
            fields: record.fields.clone(),
        })
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn insert(&self, collection: &str, record: NewRecord) -> Result<SyncRecord> {
        let db = self.db.lock().await;
        Self::insert_with(db.connection(), collection, &record)
    }

    async fn bulk_insert(&self, collection: &str, records: Vec<NewRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut db = self.db.lock().await;
        let now = unix_millis_now();
        let tx = db.connection_mut().transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO records
                    (collection, stable_id, synced, revision, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
            )?;
            for record in records.iter().filter(|record| !record.stable_id.is_empty()) {
                inserted += stmt.execute(params![
                    collection,
                    record.stable_id.as_str(),
                    i64::from(record.synced),
                    serde_json::to_string(&record.fields)?,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    async fn get(&self, collection: &str, local_key: i64) -> Result<Option<SyncRecord>> {
        let db = self.db.lock().await;
        Self::get_with(db.connection(), collection, local_key)
    }

    async fn scan_all(&self, collection: &str) -> Result<Vec<SyncRecord>> {
        let db = self.db.lock().await;
        Self::query_records(
            db.connection(),
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records WHERE collection = ?1 ORDER BY local_key"
            ),
            vec![SqlValue::Text(collection.to_string())],
        )
    }

    async fn scan_unsynced(&self, collection: &str) -> Result<Vec<SyncRecord>> {
        let db = self.db.lock().await;
        Self::query_records(
            db.connection(),
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE collection = ?1 AND synced = 0
                 ORDER BY local_key"
            ),
            vec![SqlValue::Text(collection.to_string())],
        )
    }

    async fn scan_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<SyncRecord>> {
        let path = field_path(field)?;
        let db = self.db.lock().await;

        if value.is_null() {
            return Self::query_records(
                db.connection(),
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM records
                     WHERE collection = ?1 AND json_extract(data, ?2) IS NULL
                     ORDER BY local_key"
                ),
                vec![SqlValue::Text(collection.to_string()), SqlValue::Text(path)],
            );
        }

        Self::query_records(
            db.connection(),
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE collection = ?1 AND json_extract(data, ?2) = ?3
                 ORDER BY local_key"
            ),
            vec![
                SqlValue::Text(collection.to_string()),
                SqlValue::Text(path),
                to_sql_value(value)?,
            ],
        )
    }

    async fn scan_in(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<SyncRecord>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let path = field_path(field)?;
        let mut bound = vec![SqlValue::Text(collection.to_string()), SqlValue::Text(path)];
        for value in values {
            bound.push(to_sql_value(value)?);
        }
        let placeholders = (3..=bound.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");

        let db = self.db.lock().await;
        Self::query_records(
            db.connection(),
            &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE collection = ?1 AND json_extract(data, ?2) IN ({placeholders})
                 ORDER BY local_key"
            ),
            bound,
        )
    }

    async fn stable_ids(&self, collection: &str) -> Result<HashSet<StableId>> {
        let db = self.db.lock().await;
        let mut stmt = db
            .connection()
            .prepare("SELECT stable_id FROM records WHERE collection = ?1")?;
        let ids = stmt
            .query_map(params![collection], |row| {
                row.get::<_, String>(0).map(StableId::from)
            })?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    async fn update_by_key(
        &self,
        collection: &str,
        local_key: i64,
        patch: Fields,
    ) -> Result<SyncRecord> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let mut record = Self::get_with(conn, collection, local_key)?
            .ok_or_else(|| Error::NotFound(format!("{collection}/{local_key}")))?;

        for (field, value) in patch {
            if value.is_null() {
                record.fields.remove(&field);
            } else {
                record.fields.insert(field, value);
            }
        }

        conn.execute(
            "UPDATE records
             SET data = ?1, synced = 0, revision = revision + 1, updated_at = ?2
             WHERE collection = ?3 AND local_key = ?4",
            params![
                serde_json::to_string(&record.fields)?,
                unix_millis_now(),
                collection,
                local_key
            ],
        )?;

        record.synced = false;
        record.revision += 1;
        Ok(record)
    }

    async fn mark_synced(&self, collection: &str, snapshots: &[SnapshotKey]) -> Result<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        let mut marked = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE records SET synced = 1
                 WHERE collection = ?1 AND local_key = ?2 AND revision = ?3",
            )?;
            for snapshot in snapshots {
                marked += stmt.execute(params![collection, snapshot.local_key, snapshot.revision])?;
            }
        }
        tx.commit()?;
        Ok(marked)
    }
}

/// JSON path for a top-level domain field. Field names are restricted to
/// identifier characters so they can be embedded in the path.
fn field_path(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(format!("$.{field}"))
    } else {
        Err(Error::InvalidInput(format!("invalid field name '{field}'")))
    }
}

/// Convert a JSON scalar into the value `json_extract` yields for it.
fn to_sql_value(value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real))
            .ok_or_else(|| Error::InvalidInput(format!("unsupported number {number}"))),
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(Error::InvalidInput(
            "only scalar values can be used as filters".into(),
        )),
    }
}

fn decode_data(data: &str) -> Result<Fields> {
    match serde_json::from_str(data)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(Error::Database("record data is not a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_assigns_local_key_and_keeps_stable_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let new = NewRecord::local(fields(json!({ "level": 3, "location": "knee" })));
        let stable_id = new.stable_id.clone();

        let record = store.insert("painEntries", new).await.unwrap();

        assert!(record.local_key > 0);
        assert_eq!(record.stable_id, stable_id);
        assert!(!record.synced);
        assert_eq!(record.revision, 1);

        let fetched = store
            .get("painEntries", record.local_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_rejects_empty_stable_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut new = NewRecord::local(Fields::new());
        new.stable_id = StableId::from("");

        assert!(store.insert("painEntries", new).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scans_are_scoped_to_collection() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert("painEntries", NewRecord::local(fields(json!({ "level": 3 }))))
            .await
            .unwrap();
        store
            .insert("sleepLogs", NewRecord::local(fields(json!({ "quality": 3 }))))
            .await
            .unwrap();

        assert_eq!(store.scan_all("painEntries").await.unwrap().len(), 1);
        assert_eq!(store.scan_unsynced("sleepLogs").await.unwrap().len(), 1);
        assert_eq!(store.stable_ids("journalEntries").await.unwrap().len(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scan_where_and_scan_in_filter_on_domain_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (level, location) in [(2, "knee"), (5, "hip"), (7, "knee")] {
            store
                .insert(
                    "painEntries",
                    NewRecord::local(fields(json!({ "level": level, "location": location }))),
                )
                .await
                .unwrap();
        }

        let knee = store
            .scan_where("painEntries", "location", &json!("knee"))
            .await
            .unwrap();
        assert_eq!(knee.len(), 2);

        let levels = store
            .scan_in("painEntries", "level", &[json!(2), json!(5)])
            .await
            .unwrap();
        assert_eq!(levels.len(), 2);

        let missing = store
            .scan_where("painEntries", "notes", &Value::Null)
            .await
            .unwrap();
        assert_eq!(missing.len(), 3);

        assert!(store
            .scan_where("painEntries", "level') OR 1=1 --", &json!(1))
            .await
            .is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bulk_insert_skips_existing_stable_ids() {
        let store = SqliteStore::open_in_memory().unwrap();
        let existing = store
            .insert("sleepLogs", NewRecord::local(fields(json!({ "quality": 2 }))))
            .await
            .unwrap();

        let incoming = vec![
            NewRecord {
                stable_id: existing.stable_id.clone(),
                synced: true,
                fields: fields(json!({ "quality": 5 })),
            },
            NewRecord {
                stable_id: StableId::from("x"),
                synced: true,
                fields: fields(json!({ "quality": 4 })),
            },
        ];

        let inserted = store.bulk_insert("sleepLogs", incoming).await.unwrap();
        assert_eq!(inserted, 1);

        let unchanged = store
            .get("sleepLogs", existing.local_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, existing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_requeues_record_and_bumps_revision() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = store
            .insert(
                "journalEntries",
                NewRecord::local(fields(json!({ "body": "day one", "mood": 3 }))),
            )
            .await
            .unwrap();
        store
            .mark_synced("journalEntries", &[record.snapshot_key()])
            .await
            .unwrap();

        let updated = store
            .update_by_key(
                "journalEntries",
                record.local_key,
                fields(json!({ "body": "day one, revised", "mood": null })),
            )
            .await
            .unwrap();

        assert!(!updated.synced);
        assert_eq!(updated.revision, 2);
        assert_eq!(
            Value::Object(updated.fields.clone()),
            json!({ "body": "day one, revised" })
        );

        let stored = store
            .get("journalEntries", record.local_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_missing_record_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.update_by_key("painEntries", 99, Fields::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mark_synced_ignores_stale_snapshots() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store
            .insert("painEntries", NewRecord::local(fields(json!({ "level": 1 }))))
            .await
            .unwrap();
        let second = store
            .insert("painEntries", NewRecord::local(fields(json!({ "level": 2 }))))
            .await
            .unwrap();

        store
            .update_by_key("painEntries", second.local_key, fields(json!({ "level": 3 })))
            .await
            .unwrap();

        let marked = store
            .mark_synced(
                "painEntries",
                &[first.snapshot_key(), second.snapshot_key()],
            )
            .await
            .unwrap();
        assert_eq!(marked, 1);

        let pending = store.scan_unsynced("painEntries").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_key, second.local_key);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_counts_group_by_collection() {
        let store = SqliteStore::open_in_memory().unwrap();
        for collection in ["painEntries", "painEntries", "sleepLogs"] {
            store
                .insert(collection, NewRecord::local(Fields::new()))
                .await
                .unwrap();
        }

        assert_eq!(
            store.pending_counts().await.unwrap(),
            vec![("painEntries".to_string(), 2), ("sleepLogs".to_string(), 1)]
        );
    }
}
