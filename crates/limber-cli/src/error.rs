use std::io;

use limber_core::auth::AuthError;
use limber_core::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] limber_core::Error),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry fields provided")]
    EmptyFields,
    #[error("Invalid {collection} entry: {reason}")]
    InvalidEntry {
        collection: &'static str,
        reason: String,
    },
    #[error("Could not resolve a data directory; pass --db-path")]
    NoDataDir,
    #[error(
        "Sync is not configured. Set supabase_url and supabase_anon_key in the config file, or LIMBER_SUPABASE_URL and LIMBER_SUPABASE_ANON_KEY."
    )]
    SyncNotConfigured,
    #[error("Sync finished with {0} error(s)")]
    SyncIncomplete(usize),
}
