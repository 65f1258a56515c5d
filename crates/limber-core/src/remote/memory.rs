//! In-process remote service for tests and offline demos.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{RemoteError, RemoteResult, RemoteRow, RemoteService};

const CREATED_AT_COLUMN: &str = "created_at";

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, Vec<StoredRow>>,
    failures: HashMap<String, String>,
    sequence: i64,
    upsert_calls: usize,
}

#[derive(Debug, Clone)]
struct StoredRow {
    sequence: i64,
    row: RemoteRow,
}

impl Tables {
    fn check_failure(&self, table: &str) -> RemoteResult<()> {
        match self.failures.get(table) {
            Some(message) => Err(RemoteError::Api(message.clone())),
            None => Ok(()),
        }
    }

    fn next_created_at(&mut self) -> (i64, Value) {
        self.sequence += 1;
        let created_at = Utc
            .timestamp_millis_opt(1_767_225_600_000 + self.sequence)
            .single()
            .map_or(Value::Null, |time| Value::String(time.to_rfc3339()));
        (self.sequence, created_at)
    }
}

/// Remote service held entirely in memory. Cloning shares the tables, so a
/// test can keep a handle while the engine owns another.
///
/// Upserts follow merge-duplicates semantics: a row matching an existing one
/// on the conflict column overwrites the columns it carries and keeps the rest,
/// including its original `created_at`.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    account: Option<String>,
    latency: Option<Duration>,
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRemote {
    /// A remote signed in as `account_id`
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account: Some(account_id.into()),
            ..Self::default()
        }
    }

    /// A remote with no signed-in account
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Delay every call, to hold a sync pass open
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every call against `table` fail with `message`
    pub async fn fail_table(&self, table: &str, message: impl Into<String>) {
        self.tables
            .lock()
            .await
            .failures
            .insert(table.to_string(), message.into());
    }

    pub async fn clear_failures(&self) {
        self.tables.lock().await.failures.clear();
    }

    /// Store rows as another device would have written them
    pub async fn seed(&self, table: &str, rows: Vec<RemoteRow>) {
        let mut tables = self.tables.lock().await;
        for mut row in rows {
            let (sequence, created_at) = tables.next_created_at();
            row.entry(CREATED_AT_COLUMN).or_insert(created_at);
            tables
                .rows
                .entry(table.to_string())
                .or_default()
                .push(StoredRow { sequence, row });
        }
    }

    /// Snapshot of `table` in insertion order
    pub async fn rows(&self, table: &str) -> Vec<RemoteRow> {
        self.tables
            .lock()
            .await
            .rows
            .get(table)
            .map(|rows| rows.iter().map(|stored| stored.row.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of upsert calls received, including failed ones
    pub async fn upsert_calls(&self) -> usize {
        self.tables.lock().await.upsert_calls
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteService for MemoryRemote {
    async fn account_id(&self) -> RemoteResult<Option<String>> {
        Ok(self.account.clone())
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<RemoteRow>,
        conflict_key: &str,
    ) -> RemoteResult<()> {
        self.simulate_latency().await;
        let mut tables = self.tables.lock().await;
        tables.upsert_calls += 1;
        tables.check_failure(table)?;

        if self.account.is_none() {
            return Err(RemoteError::NotAuthenticated);
        }
        if let Some(position) = rows
            .iter()
            .position(|row| row.get(conflict_key).map_or(true, Value::is_null))
        {
            return Err(RemoteError::Api(format!(
                "row {position} has no value for conflict column '{conflict_key}'"
            )));
        }

        for row in rows {
            let key = row.get(conflict_key);
            let existing = tables.rows.get(table).and_then(|stored| {
                stored
                    .iter()
                    .position(|candidate| candidate.row.get(conflict_key) == key)
            });

            match existing {
                Some(index) => {
                    if let Some(stored) = tables
                        .rows
                        .get_mut(table)
                        .and_then(|stored| stored.get_mut(index))
                    {
                        for (column, value) in row {
                            if column != CREATED_AT_COLUMN {
                                stored.row.insert(column, value);
                            }
                        }
                    }
                }
                None => {
                    let (sequence, created_at) = tables.next_created_at();
                    let mut row = row;
                    row.insert(CREATED_AT_COLUMN.to_string(), created_at);
                    tables
                        .rows
                        .entry(table.to_string())
                        .or_default()
                        .push(StoredRow { sequence, row });
                }
            }
        }

        Ok(())
    }

    async fn select_all_ordered(
        &self,
        table: &str,
        _page_size: usize,
    ) -> RemoteResult<Vec<RemoteRow>> {
        self.simulate_latency().await;
        let tables = self.tables.lock().await;
        tables.check_failure(table)?;

        if self.account.is_none() {
            return Err(RemoteError::NotAuthenticated);
        }

        let mut stored = tables.rows.get(table).cloned().unwrap_or_default();
        stored.sort_by_key(|stored| stored.sequence);
        Ok(stored.into_iter().map(|stored| stored.row).collect())
    }
}
