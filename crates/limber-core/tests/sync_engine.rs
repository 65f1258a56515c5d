//! End-to-end sync passes against an in-memory store and remote.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use limber_core::models::{Fields, NewRecord, PainEntry, SleepLog, StableId};
use limber_core::remote::{RemoteResult, RemoteRow};
use limber_core::sync::SYNC_IN_PROGRESS;
use limber_core::{
    LocalStore, MemoryRemote, Registry, RemoteService, SqliteStore, SyncConfig, SyncEngine,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn engine_with(remote: MemoryRemote) -> SyncEngine<SqliteStore, MemoryRemote> {
    SyncEngine::new(
        SqliteStore::open_in_memory().unwrap(),
        remote,
        Registry::standard().unwrap(),
    )
}

fn row(value: Value) -> RemoteRow {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test fixture must be an object"),
    }
}

fn pain_entry(level: u8) -> PainEntry {
    PainEntry {
        recorded_at: Utc.with_ymd_and_hms(2026, 4, 2, 7, 45, 0).unwrap(),
        level,
        location: "right shoulder".to_string(),
        quality: Some("sharp".to_string()),
        triggers: vec!["overhead press".to_string()],
        notes: None,
    }
}

fn sleep_log(hours: f64) -> SleepLog {
    SleepLog {
        date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        hours_slept: hours,
        quality: Some(4),
        wakeups: Some(1),
        notes: None,
    }
}

async fn insert_pain_entry(store: &SqliteStore, stable_id: &str, level: u8) -> i64 {
    let mut record = NewRecord::from_entity(&pain_entry(level)).unwrap();
    record.stable_id = StableId::from(stable_id);
    store.insert("painEntries", record).await.unwrap().local_key
}

#[tokio::test(flavor = "multi_thread")]
async fn new_local_record_is_pushed_once_and_marked_synced() {
    let remote = MemoryRemote::new("user-1");
    let engine = engine_with(remote.clone());
    let local_key = insert_pain_entry(engine.store(), "abc", 6).await;

    let report = engine.sync_all().await;

    assert_eq!(report.pushed, 1);
    assert_eq!(report.pulled, 0);
    assert!(report.is_clean(), "{:?}", report.errors);

    let record = engine
        .store()
        .get("painEntries", local_key)
        .await
        .unwrap()
        .unwrap();
    assert!(record.synced);

    let rows = remote.rows("pain_entries").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "abc");
    assert_eq!(rows[0]["user_id"], "user-1");
    assert_eq!(rows[0]["level"], 6);
    assert_eq!(rows[0]["location"], "right shoulder");
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_only_rows_are_pulled_as_synced_records() {
    let remote = MemoryRemote::new("user-1");
    remote
        .seed(
            "sleep_logs",
            vec![
                row(json!({
                    "id": "x",
                    "user_id": "user-1",
                    "date": "2026-03-30",
                    "duration_hours": 7.5,
                    "quality": 4
                })),
                row(json!({
                    "id": "y",
                    "user_id": "user-1",
                    "date": "2026-03-31",
                    "duration_hours": 5.0,
                    "wakeups": 3
                })),
            ],
        )
        .await;
    let engine = engine_with(remote);

    let report = engine.sync_all().await;

    assert_eq!(report.pulled, 2);
    assert!(report.is_clean(), "{:?}", report.errors);

    let records = engine.store().scan_all("sleepLogs").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.synced));
    assert_ne!(records[0].local_key, records[1].local_key);

    let x = engine
        .store()
        .scan_where("sleepLogs", "hoursSlept", &json!(7.5))
        .await
        .unwrap();
    assert_eq!(x.len(), 1);
    assert_eq!(x[0].stable_id, StableId::from("x"));
    assert_eq!(x[0].to_entity::<SleepLog>().unwrap().hours_slept, 7.5);
    assert!(!x[0].fields.contains_key("user_id"));
    assert!(!x[0].fields.contains_key("created_at"));
}

#[tokio::test(flavor = "multi_thread")]
async fn pulled_records_get_local_keys_in_creation_order() {
    let remote = MemoryRemote::new("user-1");
    remote
        .seed(
            "journal_entries",
            vec![
                row(json!({
                    "id": "m",
                    "date": "2026-03-01",
                    "body": "first",
                    "created_at": "2026-03-01T08:00:00Z"
                })),
                row(json!({
                    "id": "c",
                    "date": "2026-03-02",
                    "body": "second",
                    "created_at": "2026-03-02T08:00:00Z"
                })),
                row(json!({
                    "id": "x",
                    "date": "2026-03-03",
                    "body": "third",
                    "created_at": "2026-03-03T08:00:00Z"
                })),
                row(json!({
                    "id": "a",
                    "date": "2026-03-04",
                    "body": "fourth",
                    "created_at": "2026-03-04T08:00:00Z"
                })),
            ],
        )
        .await;
    let engine = engine_with(remote);

    let report = engine.sync_all().await;
    assert_eq!(report.pulled, 4);

    let records = engine.store().scan_all("journalEntries").await.unwrap();
    let ids: Vec<_> = records
        .iter()
        .map(|record| record.stable_id.to_string())
        .collect();
    assert_eq!(ids, vec!["m", "c", "x", "a"]);
    assert!(records
        .windows(2)
        .all(|pair| pair[0].local_key < pair[1].local_key));
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_push_keeps_one_remote_row_per_record() {
    let remote = MemoryRemote::new("user-1");
    let engine = engine_with(remote.clone());
    let local_key = insert_pain_entry(engine.store(), "abc", 3).await;

    engine.sync_all().await;
    engine
        .store()
        .update_by_key("painEntries", local_key, row(json!({ "level": 8 })))
        .await
        .unwrap();
    let report = engine.sync_all().await;

    assert_eq!(report.pushed, 1);
    let rows = remote.rows("pain_entries").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["level"], 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn pushed_records_are_not_pulled_back() {
    let remote = MemoryRemote::new("user-1");
    let engine = engine_with(remote);
    insert_pain_entry(engine.store(), "abc", 3).await;
    engine
        .store()
        .insert(
            "sleepLogs",
            NewRecord::from_entity(&sleep_log(6.0)).unwrap(),
        )
        .await
        .unwrap();

    let first = engine.sync_all().await;
    let second = engine.sync_all().await;

    assert_eq!((first.pushed, first.pulled), (2, 0));
    assert_eq!((second.pushed, second.pulled), (0, 0));
    assert_eq!(engine.store().scan_all("painEntries").await.unwrap().len(), 1);
    assert_eq!(engine.store().scan_all("sleepLogs").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn pull_never_overwrites_existing_local_records() {
    let remote = MemoryRemote::new("user-1");
    let engine = engine_with(remote.clone());
    let local_key = insert_pain_entry(engine.store(), "abc", 2).await;
    engine.sync_all().await;
    let before = engine
        .store()
        .get("painEntries", local_key)
        .await
        .unwrap()
        .unwrap();

    // Another device changes the row remotely.
    remote
        .upsert(
            "pain_entries",
            vec![row(json!({ "id": "abc", "user_id": "user-1", "level": 9 }))],
            "id",
        )
        .await
        .unwrap();
    let report = engine.sync_all().await;

    assert_eq!(report.pulled, 0);
    let after = engine
        .store()
        .get("painEntries", local_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after, before);
}

/// Remote that edits a local record while its push is in flight.
struct EditingRemote {
    inner: MemoryRemote,
    store: SqliteStore,
    local_key: i64,
}

#[async_trait]
impl RemoteService for EditingRemote {
    async fn account_id(&self) -> RemoteResult<Option<String>> {
        self.inner.account_id().await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<RemoteRow>,
        conflict_key: &str,
    ) -> RemoteResult<()> {
        let mut patch = Fields::new();
        patch.insert("notes".to_string(), json!("edited mid-push"));
        self.store
            .update_by_key("painEntries", self.local_key, patch)
            .await
            .unwrap();
        self.inner.upsert(table, rows, conflict_key).await
    }

    async fn select_all_ordered(
        &self,
        table: &str,
        page_size: usize,
    ) -> RemoteResult<Vec<RemoteRow>> {
        self.inner.select_all_ordered(table, page_size).await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn record_edited_during_push_stays_pending() {
    let store = SqliteStore::open_in_memory().unwrap();
    let local_key = insert_pain_entry(&store, "abc", 5).await;
    let inner = MemoryRemote::new("user-1");
    let engine = SyncEngine::new(
        store.clone(),
        EditingRemote {
            inner: inner.clone(),
            store: store.clone(),
            local_key,
        },
        Registry::standard().unwrap(),
    );

    let report = engine.sync_all().await;

    assert_eq!(report.pushed, 1);
    let record = store.get("painEntries", local_key).await.unwrap().unwrap();
    assert!(!record.synced);
    assert_eq!(record.fields["notes"], "edited mid-push");
    assert!(!inner.rows("pain_entries").await[0].contains_key("notes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_collection_does_not_block_others() {
    let remote = MemoryRemote::new("user-1");
    remote
        .fail_table("sleep_logs", "permission denied for table sleep_logs")
        .await;
    let engine = engine_with(remote.clone());
    insert_pain_entry(engine.store(), "abc", 4).await;
    let sleep = engine
        .store()
        .insert(
            "sleepLogs",
            NewRecord::from_entity(&sleep_log(7.0)).unwrap(),
        )
        .await
        .unwrap();

    let outcome = engine.push("user-1").await;

    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("sleepLogs: push failed"));
    assert_eq!(remote.rows("pain_entries").await.len(), 1);

    let pending = engine
        .store()
        .get("sleepLogs", sleep.local_key)
        .await
        .unwrap()
        .unwrap();
    assert!(!pending.synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_pull_is_reported_per_collection() {
    let remote = MemoryRemote::new("user-1");
    remote
        .seed("journal_entries", vec![row(json!({ "id": "j-1", "body": "ok" }))])
        .await;
    remote.fail_table("appointments", "relation does not exist").await;
    let engine = engine_with(remote);

    let report = engine.sync_all().await;

    assert_eq!(report.pulled, 1);
    assert_eq!(
        report.errors,
        vec!["appointments: pull failed: Remote API error: relation does not exist".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_pass_returns_conflict_immediately() {
    let remote = MemoryRemote::new("user-1").with_latency(Duration::from_millis(50));
    let engine = engine_with(remote);
    insert_pain_entry(engine.store(), "abc", 4).await;

    let (first, second) = tokio::join!(engine.sync_all(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(engine.is_syncing());
        engine.sync_all().await
    });

    assert!(first.is_clean(), "{:?}", first.errors);
    assert_eq!(first.pushed, 1);
    assert_eq!((second.pushed, second.pulled), (0, 0));
    assert_eq!(second.errors, vec![SYNC_IN_PROGRESS.to_string()]);

    assert!(!engine.is_syncing());
    assert!(engine.sync_all().await.is_clean());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_account_skips_pass_without_changes() {
    let remote = MemoryRemote::signed_out();
    let engine = engine_with(remote.clone());
    let local_key = insert_pain_entry(engine.store(), "abc", 4).await;

    let report = engine.sync_all().await;

    assert_eq!((report.pushed, report.pulled), (0, 0));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(remote.upsert_calls().await, 0);
    let record = engine
        .store()
        .get("painEntries", local_key)
        .await
        .unwrap()
        .unwrap();
    assert!(!record.synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn timed_out_collection_is_isolated() {
    let remote = MemoryRemote::new("user-1").with_latency(Duration::from_millis(100));
    let engine = engine_with(remote)
        .with_config(SyncConfig::default().with_timeout(Duration::from_millis(10)));
    insert_pain_entry(engine.store(), "abc", 4).await;

    let report = engine.sync_all().await;

    // Account lookup on the in-memory remote is instant; every table call times out.
    assert_eq!((report.pushed, report.pulled), (0, 0));
    assert_eq!(report.errors.len(), 1 + engine.registry().entries().len());
    assert!(report
        .errors
        .iter()
        .all(|error| error.contains("timed out")));
}
