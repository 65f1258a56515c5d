//! Remote record service: account-scoped, per-table upsert and ordered scan.

mod memory;
mod supabase;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::AuthError;

pub use memory::MemoryRemote;
pub use supabase::SupabaseRemote;

/// A row as stored by the remote service, keyed by remote column name
pub type RemoteRow = Map<String, Value>;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Remote call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("No signed-in account")]
    NotAuthenticated,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the sync engine needs from the remote side.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Identifier of the authenticated account, if any
    async fn account_id(&self) -> RemoteResult<Option<String>>;

    /// Insert-or-update `rows` in `table`, matching existing rows on
    /// `conflict_key`. All rows are applied or the call fails.
    async fn upsert(&self, table: &str, rows: Vec<RemoteRow>, conflict_key: &str)
        -> RemoteResult<()>;

    /// Every row of `table` visible to the account, oldest `created_at`
    /// first, fetched `page_size` rows at a time.
    async fn select_all_ordered(&self, table: &str, page_size: usize)
        -> RemoteResult<Vec<RemoteRow>>;
}
