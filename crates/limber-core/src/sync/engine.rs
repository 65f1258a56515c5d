//! Push-then-pull reconciliation between the local store and the remote service.
//!
//! Merge policy:
//! - push: every pending local record is upserted by stable id, so the last
//!   device to push a record wins on the remote side;
//! - pull: remote rows whose stable id is not known locally are inserted;
//!   rows already present locally are left untouched (pull never updates or
//!   deletes).

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use super::registry::{CollectionEntry, Registry, REMOTE_ID_COLUMN};
use super::report::{PhaseOutcome, SyncReport, SYNC_IN_PROGRESS};
use super::translate::{remote_identity, to_local, to_remote_with_identity};
use crate::config::SyncConfig;
use crate::db::LocalStore;
use crate::remote::{RemoteError, RemoteResult, RemoteService};

/// Drives sync passes for one local store and one remote service.
///
/// At most one pass runs at a time per engine: a pass requested while another
/// is running returns immediately with a conflict error.
pub struct SyncEngine<L, R> {
    store: L,
    remote: R,
    registry: Registry,
    config: SyncConfig,
    in_flight: Mutex<()>,
    running: AtomicBool,
}

/// Clears the running flag when a pass ends, including when its future is dropped.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<L: LocalStore, R: RemoteService> SyncEngine<L, R> {
    pub fn new(store: L, remote: R, registry: Registry) -> Self {
        Self {
            store,
            remote,
            registry,
            config: SyncConfig::default(),
            in_flight: Mutex::new(()),
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn store(&self) -> &L {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Whether a pass is currently running. Never contends with `sync_all`.
    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one full pass: push every collection, then pull every collection.
    ///
    /// Never fails; per-collection problems are collected in the report.
    pub async fn sync_all(&self) -> SyncReport {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Sync requested while another pass is running");
            return SyncReport::aborted(SYNC_IN_PROGRESS);
        };
        let _running = RunningFlag::raise(&self.running);

        let account_id = match self.bounded(self.remote.account_id()).await {
            Ok(Some(account_id)) => account_id,
            Ok(None) => {
                tracing::info!("Skipping sync: no signed-in account");
                return SyncReport::aborted("not signed in; sync skipped");
            }
            Err(error) => {
                tracing::warn!("Skipping sync: could not resolve account: {error}");
                return SyncReport::aborted(format!("could not resolve account: {error}"));
            }
        };

        let mut report = SyncReport::default();
        report.absorb_push(self.push(&account_id).await);
        report.absorb_pull(self.pull().await);

        if report.is_clean() {
            tracing::info!(
                "Sync complete: {} pushed, {} pulled",
                report.pushed,
                report.pulled
            );
        } else {
            tracing::warn!(
                "Sync finished with {} error(s): {} pushed, {} pulled",
                report.errors.len(),
                report.pushed,
                report.pulled
            );
        }
        report
    }

    /// Upload every pending record, collection by collection.
    pub async fn push(&self, account_id: &str) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::default();
        for entry in self.registry.entries() {
            let (pushed, error) = self.push_collection(entry, account_id).await;
            outcome.count += pushed;
            if let Some(error) = error {
                tracing::warn!("{}: push failed: {error}", entry.local_name);
                outcome
                    .errors
                    .push(format!("{}: push failed: {error}", entry.local_name));
            }
        }
        outcome
    }

    /// Download remote rows that are not yet known locally.
    pub async fn pull(&self) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::default();
        for entry in self.registry.entries() {
            match self.pull_collection(entry).await {
                Ok(pulled) => outcome.count += pulled,
                Err(error) => {
                    tracing::warn!("{}: pull failed: {error}", entry.local_name);
                    outcome
                        .errors
                        .push(format!("{}: pull failed: {error}", entry.local_name));
                }
            }
        }
        outcome
    }

    /// Returns the number of records the remote accepted, plus the error that
    /// stopped the collection, if any. Batches accepted before a failure stay
    /// marked.
    async fn push_collection(
        &self,
        entry: &CollectionEntry,
        account_id: &str,
    ) -> (usize, Option<String>) {
        let pending = match self.store.scan_unsynced(entry.local_name).await {
            Ok(pending) => pending,
            Err(error) => return (0, Some(error.to_string())),
        };
        if pending.is_empty() {
            return (0, None);
        }

        tracing::debug!(
            "{}: pushing {} pending record(s)",
            entry.local_name,
            pending.len()
        );

        let mut pushed = 0;
        for batch in pending.chunks(self.config.push_batch_size.max(1)) {
            let rows = batch
                .iter()
                .map(|record| to_remote_with_identity(record, entry, account_id))
                .collect();

            if let Err(error) = self
                .bounded(self.remote.upsert(entry.remote_name, rows, REMOTE_ID_COLUMN))
                .await
            {
                return (pushed, Some(error.to_string()));
            }
            pushed += batch.len();

            let snapshots: Vec<_> = batch.iter().map(|record| record.snapshot_key()).collect();
            match self.store.mark_synced(entry.local_name, &snapshots).await {
                Ok(marked) if marked < snapshots.len() => tracing::debug!(
                    "{}: {} record(s) changed during push and stay pending",
                    entry.local_name,
                    snapshots.len() - marked
                ),
                Ok(_) => {}
                Err(error) => return (pushed, Some(error.to_string())),
            }
        }

        (pushed, None)
    }

    async fn pull_collection(&self, entry: &CollectionEntry) -> Result<usize, String> {
        let rows = self
            .bounded(
                self.remote
                    .select_all_ordered(entry.remote_name, self.config.pull_page_size),
            )
            .await
            .map_err(|error| error.to_string())?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut known: HashSet<_> = self
            .store
            .stable_ids(entry.local_name)
            .await
            .map_err(|error| error.to_string())?;

        let mut fresh = Vec::new();
        for row in &rows {
            let Some(identity) = remote_identity(row) else {
                tracing::warn!(
                    "{}: skipping remote row without an identity",
                    entry.remote_name
                );
                continue;
            };
            if known.insert(identity) {
                fresh.push(to_local(row, entry));
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let inserted = self
            .store
            .bulk_insert(entry.local_name, fresh)
            .await
            .map_err(|error| error.to_string())?;
        tracing::debug!("{}: pulled {inserted} new record(s)", entry.local_name);
        Ok(inserted)
    }

    async fn bounded<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
        let timeout = self.config.remote_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RemoteError::Timeout(timeout))?
    }
}
